// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use std::env;
use tree_crdt::{Operation, Replica};

type Id = String;
type ActorId = String;

const ROOT: &str = "(ROOT)";

fn main() {
    let args: Vec<String> = env::args().collect();
    let demo = if args.len() > 1 { &args[1] } else { "" };

    match demo {
        "demo_concurrent_moves" => demo_concurrent_moves(),
        "demo_concurrent_moves_cycle" => demo_concurrent_moves_cycle(),
        "demo_undo_redo" => demo_undo_redo(),
        "demo_walk_deep_tree" => demo_walk_deep_tree(),
        _ => print_help(),
    }
}

fn new_replica(peer: &str) -> Replica<Id, ActorId> {
    Replica::new(peer.to_string(), ROOT.to_string())
}

// Demo: concurrent moves of the same node (section 8, property 1).
//
// Two peers move the same node to a different parent "simultaneously".
// After cross-delivering each other's op, they must converge to a common
// location, decided by last-writer-wins.
fn demo_concurrent_moves() {
    let mut r1 = new_replica("r1");
    let mut r2 = new_replica("r2");

    for r in [&mut r1, &mut r2] {
        r.add_child_to_parent("a".to_string(), ROOT.to_string()).unwrap();
        r.add_child_to_parent("b".to_string(), ROOT.to_string()).unwrap();
        r.add_child_to_parent("c".to_string(), ROOT.to_string()).unwrap();
    }

    println!("Initial tree state on both replicas");
    print_tree(&r1, &ROOT.to_string(), 0);

    let r1_ops = capture_ops(&mut r1, |r| {
        r.add_child_to_parent("a".to_string(), "b".to_string()).unwrap();
    });
    let r2_ops = capture_ops(&mut r2, |r| {
        r.add_child_to_parent("a".to_string(), "c".to_string()).unwrap();
    });

    println!("\nreplica r1 tree after its own move");
    print_tree(&r1, &ROOT.to_string(), 0);

    for op in &r2_ops {
        r1.apply_remote(op.clone()).unwrap();
    }
    for op in &r1_ops {
        r2.apply_remote(op.clone()).unwrap();
    }

    if r1.get(&"a".to_string(), &"b".to_string()) == r2.get(&"a".to_string(), &"b".to_string())
        && r1.get(&"a".to_string(), &"c".to_string()) == r2.get(&"a".to_string(), &"c".to_string())
    {
        println!("\nreplica r1 state matches replica r2 state after merging. conflict resolved!");
    } else {
        println!("\nwarning: replicas diverged after merge");
    }
    println!("\n-- r1 --");
    print_tree(&r1, &ROOT.to_string(), 0);
    println!("\n-- r2 --");
    print_tree(&r2, &ROOT.to_string(), 0);
}

// Demo: concurrent moves that would otherwise introduce a cycle (section 8,
// scenario S2). Resolved deterministically by the reattachment rule in
// tree materialization, never by detecting and rejecting the cycle up
// front.
fn demo_concurrent_moves_cycle() {
    let mut r1 = new_replica("r1");
    let mut r2 = new_replica("r2");

    for r in [&mut r1, &mut r2] {
        r.add_child_to_parent("a".to_string(), ROOT.to_string()).unwrap();
        r.add_child_to_parent("b".to_string(), ROOT.to_string()).unwrap();
        r.add_child_to_parent("c".to_string(), "a".to_string()).unwrap();
    }

    println!("Initial tree state on both replicas");
    print_tree(&r1, &ROOT.to_string(), 0);

    // r1 moves b under a; r2 concurrently moves a under b.
    let r1_ops = capture_ops(&mut r1, |r| {
        r.add_child_to_parent("b".to_string(), "a".to_string()).unwrap();
    });
    let r2_ops = capture_ops(&mut r2, |r| {
        r.add_child_to_parent("a".to_string(), "b".to_string()).unwrap();
    });

    for op in &r2_ops {
        r1.apply_remote(op.clone()).unwrap();
    }
    for op in &r1_ops {
        r2.apply_remote(op.clone()).unwrap();
    }

    println!("\nafter merge, both replicas agree and neither tree has a cycle:");
    println!("-- r1 --");
    print_tree(&r1, &ROOT.to_string(), 0);
    println!("-- r2 --");
    print_tree(&r2, &ROOT.to_string(), 0);
}

// Demo: undo/redo of a batch of local edits (section 8, scenarios S4/S5).
fn demo_undo_redo() {
    let mut r1 = new_replica("r1");

    r1.batch(|r| {
        r.add_child_to_parent("a".to_string(), ROOT.to_string()).unwrap();
        r.add_child_to_parent("b".to_string(), ROOT.to_string()).unwrap();
    });
    println!("after batched add of a, b:");
    print_tree(&r1, &ROOT.to_string(), 0);

    r1.undo();
    println!("\nafter undo (both a and b revert together):");
    print_tree(&r1, &ROOT.to_string(), 0);

    r1.redo();
    println!("\nafter redo:");
    print_tree(&r1, &ROOT.to_string(), 0);
}

// Demo: build and walk a deeper tree, 2 children per node, 5 levels deep.
fn demo_walk_deep_tree() {
    let mut r1 = new_replica("r1");
    let mut count = 0;
    mktree(&mut r1, ROOT.to_string(), 0, 5, &mut count);

    println!("walking tree ({} nodes created)...", count);
    print_tree(&r1, &ROOT.to_string(), 0);
}

fn mktree(r: &mut Replica<Id, ActorId>, parent_id: Id, depth: usize, max_depth: usize, count: &mut usize) {
    if depth >= max_depth {
        return;
    }
    for suffix in ["a", "b"] {
        let child_id = format!("{}/{}", parent_id, suffix);
        r.add_child_to_parent(child_id.clone(), parent_id.clone()).unwrap();
        *count += 1;
        mktree(r, child_id, depth + 1, max_depth, count);
    }
}

fn capture_ops<F: FnOnce(&mut Replica<Id, ActorId>)>(r: &mut Replica<Id, ActorId>, f: F) -> Vec<Operation<Id, ActorId>> {
    use std::cell::RefCell;
    use std::rc::Rc;

    let captured = Rc::new(RefCell::new(Vec::new()));
    let captured2 = captured.clone();
    r.on_local_op(Box::new(move |op| captured2.borrow_mut().push(op.clone())));
    f(r);
    Rc::try_unwrap(captured).unwrap().into_inner()
}

fn print_tree(r: &Replica<Id, ActorId>, id: &Id, depth: usize) {
    println!("{:indent$}{}", "", id, indent = depth * 2);
    for child in r.tree().children_of(id) {
        print_tree(r, &child, depth + 1);
    }
}

fn print_help() {
    println!(
        "
Usage: demo <demo>

<demo> can be any of:
  demo_concurrent_moves
  demo_concurrent_moves_cycle
  demo_undo_redo
  demo_walk_deep_tree
"
    );
}
