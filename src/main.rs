use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use supercalc::evaluator::compile_text;
use supercalc::functions::surface::render_surface;
use supercalc::{
  parse_expression, simplify, validate_text, ColormapCatalog, PlotConfig,
  SymbolTable, Validity,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Evaluate a formula at a single point
  Eval {
    /// Formula in x and y
    expression: String,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    x: f64,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    y: f64,
  },
  /// Report whether a formula is plottable
  Check {
    expression: String,
  },
  /// Print the LaTeX rendering of a formula
  Latex {
    expression: String,
    /// Simplify before typesetting
    #[arg(long)]
    simplify: bool,
  },
  /// Sample, repair and colorize a formula over the plot grid
  Plot {
    expression: String,
    /// Half-width of both axes
    #[arg(long)]
    bound: Option<f64>,
    #[arg(long)]
    x_bound: Option<f64>,
    #[arg(long)]
    y_bound: Option<f64>,
    #[arg(long)]
    resolution: Option<usize>,
    #[arg(long)]
    colormap: Option<String>,
    /// Print the grid, heights and colors as JSON
    #[arg(long)]
    json: bool,
  },
  /// List the available colormaps
  Colormaps,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn")),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let symbols = SymbolTable::default();

  match cli.command {
    Commands::Eval { expression, x, y } => {
      let function = compile_text(&expression, &symbols)
        .with_context(|| format!("cannot evaluate `{}`", expression))?;
      println!("{}", function.eval_point(x, y));
    }

    Commands::Check { expression } => match validate_text(&expression, &symbols) {
      Validity::Valid(_) => println!("valid"),
      Validity::Empty => bail!("empty formula"),
      Validity::Invalid(reason) => bail!("invalid: {}", reason),
    },

    Commands::Latex {
      expression,
      simplify: enabled,
    } => {
      let expr = parse_expression(&expression)
        .with_context(|| format!("cannot parse `{}`", expression))?;
      println!("{}", simplify(&expr, enabled).to_latex());
    }

    Commands::Plot {
      expression,
      bound,
      x_bound,
      y_bound,
      resolution,
      colormap,
      json,
    } => {
      let defaults = PlotConfig::default();
      let mut config = PlotConfig::default().with_bounds(
        x_bound.or(bound).unwrap_or(defaults.x_bound),
        y_bound.or(bound).unwrap_or(defaults.y_bound),
      );
      if let Some(resolution) = resolution {
        config = config.with_resolution(resolution);
      }
      if let Some(name) = colormap {
        config = config.with_colormap(name);
      }

      let catalog = ColormapCatalog::curated();
      config.validate(&catalog)?;
      let function = compile_text(&expression, &symbols)
        .with_context(|| format!("cannot plot `{}`", expression))?;
      let grid = config.grid();
      let data = render_surface(&function, &grid, catalog.get(&config.colormap)?)?;
      if let Err(err) = data.report.ensure_defined() {
        warn!(error = %err, "surface has no finite samples");
      }
      info!(expression = %expression, "plotted");

      if json {
        let z: Vec<&[f64]> = data.field.rows().collect();
        let colors: Vec<&[[f32; 4]]> =
          data.colors.colors().chunks(grid.shape().1.max(1)).collect();
        let output = json!({
          "expression": function.source(),
          "shape": [grid.shape().0, grid.shape().1],
          "x": grid.x_axis(),
          "y": grid.y_axis(),
          "z": z,
          "colors": colors,
          "colormap": config.colormap,
          "repaired": data.report.repaired(),
          "degenerate": data.report.degenerate,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
      } else {
        let (rows, cols) = grid.shape();
        println!("shape: {}x{}", rows, cols);
        match data.field.finite_range() {
          Some((min, max)) => println!("range: [{}, {}]", min, max),
          None => println!("range: undefined"),
        }
        println!(
          "repaired: {} of {} invalid samples",
          data.report.repaired(),
          data.report.invalid
        );
        println!("colormap: {}", config.colormap);
      }
    }

    Commands::Colormaps => {
      for name in ColormapCatalog::curated().names() {
        println!("{}", name);
      }
    }
  }

  Ok(())
}
