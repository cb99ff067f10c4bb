//! End-to-end pipeline tests: graph -> passes -> trace -> stats.
//!
//! The one contract shared by every stage: a graph rewrite must be
//! observable as a change in the trace's memory-traffic shape and
//! therefore in simulated cycles.

use kiln_codegen::{CodeGenerator, InstrKind};
use kiln_compile::{DeadCodeEliminationPass, FusionPass, MemoryLayoutPass, Optimizer, Pass};
use kiln_ir::{Graph, Shape};
use kiln_sim::{ChipConfig, Simulator};

fn build_cnn() -> Graph {
    let mut g = Graph::new();
    let x = g.add_input(Shape::from_slice(&[1, 3, 224, 224]));
    let c = g.add_conv2d(x, 64, 3, 1, 1).unwrap();
    let r = g.add_relu(c);
    g.add_output(r);
    g
}

#[test]
fn fusion_pays_off_in_simulated_cycles() {
    let unfused = CodeGenerator::new().generate(&build_cnn());

    let mut g = build_cnn();
    let mut opt = Optimizer::new();
    opt.add_pass(FusionPass);
    let reports = opt.run(&mut g);
    assert!(reports[0].modified);
    let fused = CodeGenerator::new().generate(&g);

    // One LOAD/STORE pair collapsed away.
    assert_eq!(unfused.len(), 6);
    assert_eq!(fused.len(), 3);
    let mem = |trace: &[kiln_codegen::Instruction]| {
        trace
            .iter()
            .filter(|i| matches!(i.kind, InstrKind::Load | InstrKind::Store))
            .count()
    };
    assert_eq!(mem(&unfused), 4);
    assert_eq!(mem(&fused), 2);

    let mut sim = Simulator::new(ChipConfig::default()).unwrap();
    let before = sim.execute(&unfused);
    let after = sim.execute(&fused);
    assert!(after.cycles < before.cycles);
    assert_eq!(after.memory_accesses, 2);
    assert!(after.memory_bound_time <= 100.0);
}

#[test]
fn full_pipeline_with_dead_branch() {
    let mut g = build_cnn();
    // A pooling branch nothing consumes.
    let x = g.nodes().next().unwrap().outputs()[0];
    g.add_maxpool(x, 2, 2).unwrap();

    let mut opt = Optimizer::new();
    opt.add_pass(FusionPass);
    opt.add_pass(DeadCodeEliminationPass);
    opt.add_pass(MemoryLayoutPass);
    let reports = opt.run(&mut g);
    assert!(reports.iter().all(|r| r.modified));

    let trace = CodeGenerator::new().generate(&g);
    // Only the fused conv survives: the dead pool emits nothing.
    assert_eq!(trace.len(), 3);
    assert_eq!(trace[0].op_name, "FusedConvReLU");

    let mut sim = Simulator::new(ChipConfig::default()).unwrap();
    let stats = sim.execute(&trace);
    assert!(stats.cycles > 0);
    assert_eq!(
        stats.memory_accesses,
        stats.cache_hits + stats.cache_misses + 1
    );
}

#[test]
fn wider_chip_runs_faster() {
    let mut g = build_cnn();
    FusionPass.run(&mut g);
    let trace = CodeGenerator::new().generate(&g);

    let mut narrow = Simulator::new(ChipConfig {
        compute_units: 4,
        simd_width: 4,
        ..ChipConfig::default()
    })
    .unwrap();
    let mut wide = Simulator::new(ChipConfig {
        compute_units: 32,
        simd_width: 16,
        ..ChipConfig::default()
    })
    .unwrap();

    let slow = narrow.execute(&trace);
    let fast = wide.execute(&trace);
    assert!(fast.cycles < slow.cycles);
    // Narrower compute shifts the balance toward compute-bound.
    assert!(fast.compute_utilization < slow.compute_utilization);
}
