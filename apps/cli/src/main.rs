// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI tool: preview a receive by replaying a portable graph into the
//! in-memory analysis host.
//!
//! Usage:
//!   structsync demo <graph.json>
//!   structsync receive <graph.json> [options]

use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use structsync_engine::{
    CancellationToken, ElementDatabase, ElementKind, MemoryDatabase, NativeObject, ReceiveMode,
    Snapshot, SyncConfig, SyncSession, TracingSink,
};
use structsync_model::{
    GraphObject, LinearMember, Member, Node, ObjectBody, ObjectGraph, ObjectKey, Restraint,
    SectionProfile, SectionProperty, SurfaceMember, SurfaceProperty, SurfacePropertyKind,
};

struct ReceiveArgs {
    graph_path: String,
    previous_path: Option<String>,
    snapshot_path: String,
    send_path: Option<String>,
    version: String,
    mode: Option<ReceiveMode>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            env::var("RUST_LOG").unwrap_or_else(|_| "info,structsync_engine=debug".into()),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let result = match args[1].as_str() {
        "demo" => write_demo(&args[2]),
        "receive" => parse_receive(&args[2..]).and_then(run_receive),
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!("structsync - replay a structural object graph into an in-memory analysis model");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  structsync demo <graph.json>          Write a sample portal frame graph");
    eprintln!("  structsync receive <graph.json> [options]");
    eprintln!();
    eprintln!("Receive options:");
    eprintln!("  --previous <path>   Snapshot of an earlier receive");
    eprintln!("  --snapshot <path>   Where to write this run's snapshot (default: snapshot.json)");
    eprintln!("  --send <path>       Send the resulting model back out as a graph");
    eprintln!("  --version <v>       Host program version (default: 21.0.0)");
    eprintln!("  --mode <m>          update, create or ignore (default: STRUCTSYNC_RECEIVE_MODE or update)");
    eprintln!();
    eprintln!("Set RUST_LOG to control log output.");
}

fn parse_receive(args: &[String]) -> Result<ReceiveArgs> {
    let mut parsed = ReceiveArgs {
        graph_path: args[0].clone(),
        previous_path: None,
        snapshot_path: String::from("snapshot.json"),
        send_path: None,
        version: String::from("21.0.0"),
        mode: None,
    };

    let mut i = 1;
    while i < args.len() {
        let value = || {
            args.get(i + 1)
                .cloned()
                .with_context(|| format!("{} needs a value", args[i]))
        };
        match args[i].as_str() {
            "--previous" => parsed.previous_path = Some(value()?),
            "--snapshot" => parsed.snapshot_path = value()?,
            "--send" => parsed.send_path = Some(value()?),
            "--version" => parsed.version = value()?,
            "--mode" => {
                let mode: ReceiveMode = value()?.parse().map_err(anyhow::Error::msg)?;
                parsed.mode = Some(mode);
            }
            other => bail!("unknown option: {}", other),
        }
        i += 2;
    }
    Ok(parsed)
}

fn run_receive(args: ReceiveArgs) -> Result<()> {
    let json = fs::read_to_string(&args.graph_path)
        .with_context(|| format!("reading {}", args.graph_path))?;
    let graph = ObjectGraph::from_json(&json)?;

    let previous = match &args.previous_path {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
            Snapshot::from_json(&json)?
        }
        None => Snapshot::default(),
    };

    let mut config = SyncConfig::from_env();
    if let Some(mode) = args.mode {
        config = config.with_receive_mode(mode);
    }

    let mut session = SyncSession::new(MemoryDatabase::new(args.version.as_str()), config);
    let cancel = CancellationToken::new();
    let mut sink = TracingSink;
    let outcome = session.receive(&graph, &previous, &cancel, &mut sink)?;

    println!("{}", outcome.summary);
    let db = session.database();
    for kind in [ElementKind::Point, ElementKind::Frame, ElementKind::Area] {
        println!("  {:<6} {}", kind.as_str(), db.count(kind));
    }
    for record in &outcome.removed {
        println!("  removed {}", record.original_id);
    }

    fs::write(&args.snapshot_path, outcome.snapshot.to_json()?)
        .with_context(|| format!("writing {}", args.snapshot_path))?;
    println!("Snapshot written to {}", args.snapshot_path);

    if let Some(path) = &args.send_path {
        let selection: Vec<NativeObject> = [ElementKind::Frame, ElementKind::Area]
            .into_iter()
            .flat_map(|kind| {
                db.names(kind)
                    .into_iter()
                    .map(move |name| NativeObject::new(kind, name))
            })
            .collect();
        let sent = session.send(&selection, &cancel, &mut sink)?;
        fs::write(path, sent.graph.to_json_pretty()?).with_context(|| format!("writing {}", path))?;
        println!("Sent {} element(s) to {}", sent.summary.created, path);
    }
    Ok(())
}

/// Portal frame over a slab with one opening.
fn write_demo(path: &str) -> Result<()> {
    let mut graph = ObjectGraph::new();
    let node = |graph: &mut ObjectGraph, x: f64, y: f64, z: f64, restraint: Option<Restraint>| {
        let mut node = Node::at(x, y, z);
        node.restraint = restraint;
        graph.add(GraphObject::new(ObjectBody::Node(node)))
    };

    let base_left = node(&mut graph, 0.0, 0.0, 0.0, Some(Restraint::fixed()));
    let base_right = node(&mut graph, 6.0, 0.0, 0.0, Some(Restraint::fixed()));
    let top_left = node(&mut graph, 0.0, 0.0, 3.0, None);
    let top_right = node(&mut graph, 6.0, 0.0, 3.0, None);
    let top_back_right = node(&mut graph, 6.0, 4.0, 3.0, None);
    let top_back_left = node(&mut graph, 0.0, 4.0, 3.0, None);

    let column_section = graph.add(GraphObject::new(ObjectBody::SectionProperty(SectionProperty {
        name: "C400x400".into(),
        material: None,
        profile: SectionProfile::Rectangular {
            width: 0.4,
            depth: 0.4,
        },
    })));
    let beam_section = graph.add(GraphObject::new(ObjectBody::SectionProperty(SectionProperty {
        name: "B300x600".into(),
        material: None,
        profile: SectionProfile::Rectangular {
            width: 0.3,
            depth: 0.6,
        },
    })));
    let slab_property = graph.add(GraphObject::new(ObjectBody::SurfaceProperty(SurfaceProperty {
        name: "SLAB200".into(),
        material: None,
        thickness: 0.2,
        kind: SurfacePropertyKind::Slab,
    })));

    let frame = |graph: &mut ObjectGraph, id: &str, a: ObjectKey, b: ObjectKey, section: ObjectKey| {
        let mut member = LinearMember::between(a, b);
        member.property = Some(section);
        graph.add(GraphObject::new(ObjectBody::LinearMember(member)).with_application_id(id))
    };
    let mut elements = vec![
        frame(&mut graph, "demo-col-left", base_left, top_left, column_section),
        frame(&mut graph, "demo-col-right", base_right, top_right, column_section),
        frame(&mut graph, "demo-beam", top_left, top_right, beam_section),
    ];

    let hole = vec![
        node(&mut graph, 2.0, 1.0, 3.0, None),
        node(&mut graph, 3.0, 1.0, 3.0, None),
        node(&mut graph, 3.0, 2.0, 3.0, None),
        node(&mut graph, 2.0, 2.0, 3.0, None),
    ];
    let mut slab = SurfaceMember::bounded_by(vec![top_left, top_right, top_back_right, top_back_left]);
    slab.property = Some(slab_property);
    slab.holes.push(hole);
    elements.push(graph.add(GraphObject::new(ObjectBody::SurfaceMember(slab)).with_application_id("demo-slab")));

    graph.add_root(
        GraphObject::new(ObjectBody::Collection {
            name: "demo".into(),
        })
        .with_member("elements", Member::List(elements)),
    );

    fs::write(path, graph.to_json_pretty()?).with_context(|| format!("writing {}", path))?;
    println!("Demo graph with {} objects written to {}", graph.len(), path);
    Ok(())
}
