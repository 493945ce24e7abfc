mod params;

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mlm_r2_core::data::DataFrame;
use mlm_r2_core::decomposition::{LevelTable, Measure};
use mlm_r2_core::plot::save_svg;
use mlm_r2_core::{compare, decompose, Comparison, Decomposition, DecompositionOptions};

use params::ModelFile;

#[derive(Parser)]
#[command(name = "r2mlm")]
#[command(version)]
#[command(about = "R-squared measures and variance decomposition for two-level multilevel models")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose the outcome variance of a single model
    Decompose {
        /// Path to the CSV the model was fit on
        #[arg(short, long)]
        data: String,

        /// Path to the model's parameter estimates (JSON)
        #[arg(short, long)]
        model: String,

        /// Level-1 predictors are not cluster-mean-centered
        #[arg(long)]
        not_centered: bool,

        /// Write a stacked bar chart to this SVG file
        #[arg(long)]
        graph: Option<String>,

        /// Output format: "text" (default) or "json"
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Compare two models fit on the same data (B - A)
    Compare {
        /// Path to the CSV both models were fit on
        #[arg(short, long)]
        data: String,

        /// Parameter estimates of model A (JSON)
        #[arg(long)]
        model_a: String,

        /// Parameter estimates of model B (JSON)
        #[arg(long)]
        model_b: String,

        /// Write a grouped bar chart to this SVG file
        #[arg(long)]
        graph: Option<String>,

        /// Output format: "text" (default) or "json"
        #[arg(long, default_value = "text")]
        format: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Decompose {
            data,
            model,
            not_centered,
            graph,
            format,
        } => cmd_decompose(&data, &model, !not_centered, graph.as_deref(), &format),
        Commands::Compare {
            data,
            model_a,
            model_b,
            graph,
            format,
        } => cmd_compare(&data, &model_a, &model_b, graph.as_deref(), &format),
    }
}

fn load_data(path: &str) -> Result<DataFrame> {
    let df = DataFrame::from_csv(path)
        .with_context(|| format!("Failed to load data from '{}'", path))?;
    log::info!(
        "Loaded {} observations, {} columns from '{}'",
        df.nrows(),
        df.ncols(),
        path
    );
    Ok(df)
}

fn cmd_decompose(
    data_path: &str,
    model_path: &str,
    centered: bool,
    graph: Option<&str>,
    output_format: &str,
) -> Result<()> {
    let df = load_data(data_path)?;
    let file = ModelFile::from_path(model_path)?;

    let options = DecompositionOptions::new()
        .has_intercept(file.has_intercept())
        .cluster_mean_centered(centered)
        .with_graph(graph.is_some());
    let spec = file.into_spec().context("Invalid model specification")?;

    let result = decompose(&df, &spec, options).context("Decomposition failed")?;

    if let (Some(path), Some(svg)) = (graph, result.chart.as_deref()) {
        save_svg(svg, Path::new(path))
            .with_context(|| format!("Failed to write chart to '{}'", path))?;
        log::info!("Wrote chart to '{}'", path);
    }

    match output_format.to_lowercase().as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&decomposition_json(&result))?),
        _ => println!("{}", result.summary()),
    }
    Ok(())
}

fn cmd_compare(
    data_path: &str,
    model_a_path: &str,
    model_b_path: &str,
    graph: Option<&str>,
    output_format: &str,
) -> Result<()> {
    let df = load_data(data_path)?;
    let file_a = ModelFile::from_path(model_a_path)?;
    let file_b = ModelFile::from_path(model_b_path)?;

    if file_a.has_intercept() != file_b.has_intercept() {
        anyhow::bail!("Models A and B must both have, or both lack, a fixed intercept");
    }
    let options = DecompositionOptions::new()
        .has_intercept(file_a.has_intercept())
        .with_graph(graph.is_some());

    let spec_a = file_a.into_spec().context("Invalid specification for model A")?;
    let spec_b = file_b.into_spec().context("Invalid specification for model B")?;

    let result = compare(&df, &spec_a, &spec_b, options).context("Model comparison failed")?;

    if let (Some(path), Some(svg)) = (graph, result.chart.as_deref()) {
        save_svg(svg, Path::new(path))
            .with_context(|| format!("Failed to write chart to '{}'", path))?;
        log::info!("Wrote chart to '{}'", path);
    }

    match output_format.to_lowercase().as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&comparison_json(&result))?),
        _ => println!("{}", result.summary()),
    }
    Ok(())
}

fn table_json<K>(table: &LevelTable<K>) -> serde_json::Value
where
    K: Copy + PartialEq + std::fmt::Display,
{
    let rows: Vec<serde_json::Value> = table
        .rows()
        .iter()
        .map(|(key, row)| {
            serde_json::json!({
                "name": key.to_string(),
                "total": row.total,
                "within": row.within,
                "between": row.between,
            })
        })
        .collect();
    serde_json::json!(rows)
}

fn named_json(cells: &[(&str, f64)]) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = cells
        .iter()
        .map(|(name, value)| (name.to_string(), serde_json::json!(value)))
        .collect();
    serde_json::Value::Object(map)
}

fn decomposition_json(d: &Decomposition) -> serde_json::Value {
    let c = &d.components;
    serde_json::json!({
        "cluster_mean_centered": d.options.cluster_mean_centered,
        "components": {
            "fixed_within": c.fixed_within,
            "fixed_between": c.fixed_between,
            "fixed_pooled": c.fixed_pooled,
            "slope_variation": c.slope_variation,
            "mean_variation": c.mean_variation,
            "residual": c.residual,
            "total_within": c.total_within,
            "total_between": c.total_between,
            "total": c.total,
            "total_notdecomp": c.total_notdecomp,
        },
        "decomposition": table_json(&d.proportions),
        "r_squared": table_json(&d.r_squared),
        "measures": named_json(&d.named_measures()),
    })
}

fn comparison_json(c: &Comparison) -> serde_json::Value {
    let differences: &LevelTable<Measure> = &c.differences;
    serde_json::json!({
        "model_a": decomposition_json(&c.model_a),
        "model_b": decomposition_json(&c.model_b),
        "differences": table_json(differences),
        "delta": named_json(&c.named_differences()),
    })
}
