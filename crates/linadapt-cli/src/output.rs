//! Human-readable report formatting for evaluation results.

use crate::eval::EvalReport;

/// Prints the evaluation report as aligned tables.
pub fn print_report(report: &EvalReport) {
    println!("\n{}", "=".repeat(80));
    println!("RETRIEVAL QUALITY EVALUATION");
    println!("{}", "=".repeat(80));
    println!(
        "Dataset: {} ({} chunks, {} queries)",
        report.dataset, report.num_nodes, report.num_queries
    );

    println!("\n{}", "-".repeat(70));
    print!("{:<16} {:>10}", "SYSTEM", "MRR");
    for k in &report.k_values {
        print!(" {:>12}", format!("hit_rate@{}", k));
    }
    println!();
    println!("{}", "-".repeat(70));

    for system in &report.systems {
        print!("{:<16} {:>10.4}", system.name, system.mrr);
        for k in &report.k_values {
            let rate = system.hit_rate_at_k.get(k).copied().unwrap_or(0.0);
            print!(" {:>12.4}", rate);
        }
        println!();
    }

    if !report.comparisons.is_empty() {
        println!("\n{}", "-".repeat(70));
        println!("COMPARISONS VS BASE (* = p < 0.05)");
        for c in &report.comparisons {
            let sig = if c.p_value < 0.05 { "*" } else { "" };
            println!(
                "  {} vs {}: ΔMRR={:+.4}, t={:.3}, p={:.4}{}, d={:.3} ({})",
                c.system_a, c.system_b, c.mrr_delta, c.t_statistic, c.p_value, sig,
                c.effect_size, c.effect_label
            );
        }
    }

    println!("{}\n", "=".repeat(80));
}
