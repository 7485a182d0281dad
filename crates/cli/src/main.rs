use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use treepheno_core as core;
use core::ancestry::{Ancestry, TreeSequence};
use core::data::{DataFrame, GeneticValueTable};
use core::simulate::{
    causal_count, sim_env, simulate_replicates, Heritability, PhenotypeSimulator,
    SimulationResult, TraitModel,
};

#[derive(Parser)]
#[command(name = "treepheno")]
#[command(version)]
#[command(about = "Simulate quantitative-trait phenotypes on genealogical tree sequences")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select causal sites, compute genetic values and add environmental noise
    Simulate {
        /// Path to the tree sequence JSON file
        #[arg(short, long)]
        ancestry: String,

        /// Number of causal sites per trait
        #[arg(short = 'c', long, allow_negative_numbers = true)]
        num_causal: i64,

        /// Mean of the effect-size distribution
        #[arg(long, default_value = "0.0", allow_negative_numbers = true)]
        trait_mean: f64,

        /// Standard deviation of the effect-size distribution
        #[arg(long, default_value = "1.0", allow_negative_numbers = true)]
        trait_sd: f64,

        /// Narrow-sense heritability (repeat once per trait)
        #[arg(long = "h2", default_value = "0.5", allow_negative_numbers = true)]
        h2: Vec<f64>,

        /// Random seed (replicate k uses seed + k)
        #[arg(long)]
        seed: Option<u64>,

        /// Number of independent replicates
        #[arg(long, default_value = "1")]
        replicates: u64,

        /// Prefix for output CSV files; nothing is written when omitted
        #[arg(short, long)]
        out_prefix: Option<String>,

        /// Output format: "text" (default) or "json"
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Add environmental noise to a genetic-value CSV
    /// (columns: trait_id, individual_id, genetic_value)
    Environment {
        /// Path to the genetic-value CSV
        #[arg(short, long)]
        genetic: String,

        /// Narrow-sense heritability (repeat once per trait)
        #[arg(long = "h2", required = true, allow_negative_numbers = true)]
        h2: Vec<f64>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Output phenotype CSV
        #[arg(short, long)]
        out: String,
    },

    /// Print a summary of a tree sequence JSON file
    Inspect {
        /// Path to the tree sequence JSON file
        #[arg(short, long)]
        ancestry: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            ancestry,
            num_causal,
            trait_mean,
            trait_sd,
            h2,
            seed,
            replicates,
            out_prefix,
            format,
        } => cmd_simulate(
            &ancestry,
            num_causal,
            trait_mean,
            trait_sd,
            &h2,
            seed,
            replicates,
            out_prefix.as_deref(),
            &format,
        ),
        Commands::Environment {
            genetic,
            h2,
            seed,
            out,
        } => cmd_environment(&genetic, h2, seed, &out),
        Commands::Inspect { ancestry } => cmd_inspect(&ancestry),
    }
}

fn load_ancestry(path: &str) -> Result<TreeSequence> {
    let ts = TreeSequence::from_json_file(path)
        .with_context(|| format!("Failed to load tree sequence from '{}'", path))?;
    eprintln!(
        "Loaded {} trees, {} mutations, {} individuals from '{}'",
        ts.num_trees(),
        ts.num_mutations(),
        ts.num_individuals(),
        path
    );
    Ok(ts)
}

#[allow(clippy::too_many_arguments)]
fn cmd_simulate(
    ancestry_path: &str,
    num_causal: i64,
    trait_mean: f64,
    trait_sd: f64,
    h2: &[f64],
    seed: Option<u64>,
    replicates: u64,
    out_prefix: Option<&str>,
    output_format: &str,
) -> Result<()> {
    let ts = load_ancestry(ancestry_path)?;
    let num_causal = causal_count(num_causal)?;

    // One trait per heritability value, sharing the effect-size settings.
    let traits: Vec<TraitModel> = h2
        .iter()
        .map(|&h| TraitModel::new(num_causal).mean(trait_mean).sd(trait_sd).h2(h))
        .collect();
    log::debug!("Trait models: {:?}", traits);

    let results = if replicates <= 1 {
        let mut sim = PhenotypeSimulator::new(&ts).traits(&traits);
        if let Some(s) = seed {
            sim = sim.seed(s);
        }
        vec![sim.run().context("Phenotype simulation failed")?]
    } else {
        let base = seed.unwrap_or_else(rand::random::<u64>);
        let seeds: Vec<u64> = (0..replicates).map(|k| base.wrapping_add(k)).collect();
        simulate_replicates(&ts, &traits, &seeds).context("Replicate simulation failed")?
    };

    if let Some(prefix) = out_prefix {
        for (k, result) in results.iter().enumerate() {
            let stem = if results.len() == 1 {
                prefix.to_string()
            } else {
                format!("{}.rep{}", prefix, k)
            };
            write_result(result, &stem)?;
        }
    }

    match output_format.to_lowercase().as_str() {
        "json" => print_json(&results)?,
        _ => print_text(&results),
    }

    Ok(())
}

fn write_result(result: &SimulationResult, stem: &str) -> Result<()> {
    let pheno_path = format!("{}.phenotype.csv", stem);
    result
        .phenotypes
        .to_dataframe()?
        .to_csv(&pheno_path)
        .with_context(|| format!("Failed to write '{}'", pheno_path))?;

    let sites_path = format!("{}.causal_sites.csv", stem);
    result
        .causal_sites
        .to_dataframe()?
        .to_csv(&sites_path)
        .with_context(|| format!("Failed to write '{}'", sites_path))?;

    eprintln!("Wrote '{}' and '{}'", pheno_path, sites_path);
    Ok(())
}

/// Per-trait phenotype mean, variance and realised heritability.
fn trait_summary(result: &SimulationResult) -> Vec<(usize, f64, f64, f64)> {
    let trait_ids = result.genetic_values.trait_ids();
    trait_ids
        .into_iter()
        .map(|t| {
            let (g, p): (Vec<f64>, Vec<f64>) = result
                .phenotypes
                .for_trait(t)
                .map(|r| (r.genetic_value, r.phenotype))
                .unzip();
            let var = |v: &[f64]| {
                let n = v.len() as f64;
                let mean = v.iter().sum::<f64>() / n;
                v.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n
            };
            let mean = p.iter().sum::<f64>() / p.len() as f64;
            let var_p = var(&p);
            let realised_h2 = if var_p > 0.0 { var(&g) / var_p } else { f64::NAN };
            (t, mean, var_p, realised_h2)
        })
        .collect()
}

fn print_text(results: &[SimulationResult]) {
    for (k, result) in results.iter().enumerate() {
        println!("Replicate {}", k);
        println!(
            "  {} phenotype rows, {} causal sites",
            result.phenotypes.len(),
            result.causal_sites.len()
        );
        for (t, mean, var, h2) in trait_summary(result) {
            println!(
                "  trait {}: mean = {:.4}, variance = {:.4}, realised h2 = {:.3}",
                t, mean, var, h2
            );
        }
    }
}

fn print_json(results: &[SimulationResult]) -> Result<()> {
    let reps: Vec<serde_json::Value> = results
        .iter()
        .enumerate()
        .map(|(k, result)| {
            let traits: Vec<serde_json::Value> = trait_summary(result)
                .into_iter()
                .map(|(t, mean, var, h2)| {
                    serde_json::json!({
                        "trait_id": t,
                        "mean": mean,
                        "variance": var,
                        "realised_h2": h2,
                    })
                })
                .collect();
            let sites: Vec<serde_json::Value> = result
                .causal_sites
                .rows
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "trait_id": s.trait_id,
                        "mutation_id": s.mutation_id,
                        "position": s.position,
                        "node": s.node,
                        "effect_size": s.effect_size,
                    })
                })
                .collect();
            serde_json::json!({
                "replicate": k,
                "n_phenotypes": result.phenotypes.len(),
                "traits": traits,
                "causal_sites": sites,
            })
        })
        .collect();

    let json_str = serde_json::to_string_pretty(&serde_json::json!({ "replicates": reps }))?;
    println!("{}", json_str);
    Ok(())
}

fn cmd_environment(genetic_path: &str, h2: Vec<f64>, seed: Option<u64>, out: &str) -> Result<()> {
    let df = DataFrame::from_csv(genetic_path)
        .with_context(|| format!("Failed to load genetic values from '{}'", genetic_path))?;
    let table = GeneticValueTable::from_dataframe(&df)
        .with_context(|| format!("'{}' is not a genetic-value table", genetic_path))?;

    eprintln!(
        "Loaded {} genetic values for {} trait(s) from '{}'",
        table.len(),
        table.trait_ids().len(),
        genetic_path
    );

    let heritability = if h2.len() == 1 {
        Heritability::Scalar(h2[0])
    } else {
        Heritability::PerTrait(h2)
    };
    let pheno = sim_env(&table, heritability, seed).context("Environment simulation failed")?;

    pheno
        .to_dataframe()?
        .to_csv(out)
        .with_context(|| format!("Failed to write '{}'", out))?;
    println!("Wrote {} phenotype rows to '{}'", pheno.len(), out);
    Ok(())
}

fn cmd_inspect(ancestry_path: &str) -> Result<()> {
    let ts = load_ancestry(ancestry_path)?;

    println!("Sequence length: {}", ts.sequence_length());
    println!("Nodes:           {}", ts.num_nodes());
    println!("Trees:           {}", ts.num_trees());
    println!("Sites:           {}", ts.sites().len());
    println!("Mutations:       {}", ts.num_mutations());
    println!("Individuals:     {}", ts.num_individuals());

    println!("\nFirst trees:");
    for (i, tree) in ts.trees().iter().enumerate().take(5) {
        println!(
            "  {}: [{}, {}) span = {}, root = {}, leaves = {}",
            i,
            tree.left,
            tree.right,
            tree.span(),
            tree.root(),
            tree.leaves().len()
        );
    }
    Ok(())
}
