//! Example driver: build a graph, optimize, lower, and simulate it on
//! two hardware configs.

use std::error::Error;
use std::fs;

use tracing::info;

use kiln_codegen::CodeGenerator;
use kiln_compile::{DeadCodeEliminationPass, FusionPass, MemoryLayoutPass, Optimizer};
use kiln_ir::{Graph, Shape};
use kiln_sim::{ChipConfig, ExecutionStats, Simulator};

fn high_end_chip() -> ChipConfig {
    ChipConfig {
        compute_units: 32,
        memory_bandwidth_gb_s: 200.0,
        cache_size_kb: 512,
        simd_width: 16,
        clock_freq_ghz: 2.0,
    }
}

fn low_end_chip() -> ChipConfig {
    ChipConfig {
        compute_units: 4,
        memory_bandwidth_gb_s: 50.0,
        cache_size_kb: 128,
        simd_width: 4,
        clock_freq_ghz: 1.0,
    }
}

/// `[1,3,224,224] -> Conv2D(64,3x3) -> ReLU -> Output`.
fn build_cnn() -> Result<Graph, Box<dyn Error>> {
    let mut g = Graph::new();
    let input = g.add_input(Shape::from_slice(&[1, 3, 224, 224]));
    let conv = g.add_conv2d(input, 64, 3, 1, 1)?;
    let relu = g.add_relu(conv);
    g.add_output(relu);
    Ok(g)
}

/// A linear layer: `[64,256] x [256,128] + bias -> Output`.
fn build_mlp() -> Result<Graph, Box<dyn Error>> {
    let mut g = Graph::new();
    let x = g.add_input(Shape::from_slice(&[64, 256]));
    let w = g.add_input(Shape::from_slice(&[256, 128]));
    let bias = g.add_input(Shape::from_slice(&[64, 128]));
    let mm = g.add_matmul(x, w)?;
    let sum = g.add_add(mm, bias)?;
    g.add_output(sum);
    Ok(g)
}

fn simulate(name: &str, config: ChipConfig, trace: &[kiln_codegen::Instruction])
    -> Result<ExecutionStats, Box<dyn Error>>
{
    println!("\n--- {name} ---");
    println!("{config}");
    let mut sim = Simulator::new(config)?;
    let stats = sim.execute(trace);
    println!("{stats}");
    Ok(stats)
}

fn run_pipeline(label: &str, mut graph: Graph) -> Result<(), Box<dyn Error>> {
    println!("\n===== {label} =====");
    println!("\nOriginal graph:\n{graph}");

    let mut opt = Optimizer::new();
    opt.add_pass(FusionPass);
    opt.add_pass(DeadCodeEliminationPass);
    opt.add_pass(MemoryLayoutPass);
    for report in opt.run(&mut graph) {
        info!(
            pass = report.name.as_str(),
            modified = report.modified,
            "pass complete"
        );
    }
    println!("Optimized graph:\n{graph}");

    let trace = CodeGenerator::new().generate(&graph);
    info!(instructions = trace.len(), "lowered graph");
    for inst in &trace {
        println!("  {inst}");
    }

    let fast = simulate("high-end chip", high_end_chip(), &trace)?;
    let slow = simulate("low-end chip", low_end_chip(), &trace)?;
    println!(
        "\nSpeedup from high-end chip: {:.2}x",
        slow.execution_time_ms / fast.execution_time_ms
    );

    // An extra config can be passed as a JSON file.
    if let Some(path) = std::env::args().nth(1) {
        let config: ChipConfig = serde_json::from_str(&fs::read_to_string(&path)?)?;
        simulate(&format!("custom chip ({path})"), config, &trace)?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    run_pipeline("CNN example", build_cnn()?)?;
    run_pipeline("MLP example", build_mlp()?)?;
    Ok(())
}
