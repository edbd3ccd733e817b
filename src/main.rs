//! RF distribution network planner.
//!
//! Loads a plan file, computes the signal level at every node and applies
//! structural edits (type replacement, grid compaction) with undo/redo.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use env_logger::Builder;
use log::{LevelFilter, info, warn};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::PlannerConfig;
use crate::network::{EditHistory, Frequency, NodeId, NodeKind, Topology, optimize_space, replace_node};
use crate::plan::{load_plan, plan_issues, plan_to_json, save_plan, validate_plan};
use crate::propagation::{compute_signal_power, power_at};
use crate::report::SignalReport;

mod config;
mod network;
mod plan;
mod propagation;
mod report;

#[derive(Parser)]
#[command(name = "rf-planner")]
#[command(about = "Signal budget planner for in-building RF distribution networks", long_about = None)]
#[command(version)]
struct Cli {
    /// Plan file (JSON)
    #[arg(value_name = "PLAN")]
    plan: PathBuf,

    /// Config file, defaults to config.toml next to the plan
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Base station signal in dBm (overrides config)
    #[arg(short, long, value_name = "DBM", allow_negative_numbers = true)]
    signal: Option<f64>,

    /// Operating frequency in MHz: 800, 900, 1800, 2100 or 2600 (overrides config)
    #[arg(short, long, value_name = "MHZ")]
    frequency: Option<u32>,

    /// Debug logging for the planner
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute and print the signal level at every node
    Compute {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Only print the level at this node
        #[arg(long, value_name = "ID", conflicts_with = "json")]
        node: Option<NodeId>,
    },
    /// Change the kind of one node, spawning or removing its children
    Replace {
        node_id: NodeId,
        /// antenna, load, repeater, coupler, booster, attenuator, splitter2-4 or combiner2-4
        kind: NodeKind,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Keep empty rows and columns
        #[arg(long)]
        no_optimize: bool,
    },
    /// Remove empty rows and columns
    Optimize {
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Apply a sequence of edit steps: "replace <id> <kind>", "optimize", "undo", "redo"
    Edit {
        #[arg(required = true)]
        steps: Vec<String>,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Report every integrity problem in the plan
    Validate,
}

/// One step of an `edit` session.
#[derive(Debug, Clone, PartialEq)]
enum EditStep {
    Replace(NodeId, NodeKind),
    Optimize,
    Undo,
    Redo,
}

impl FromStr for EditStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = s.split_whitespace().collect();
        match words.as_slice() {
            ["replace", id, kind] => {
                let id = id.parse::<NodeId>().map_err(|_| format!("Invalid node id '{}'", id))?;
                Ok(EditStep::Replace(id, kind.parse()?))
            }
            ["optimize"] => Ok(EditStep::Optimize),
            ["undo"] => Ok(EditStep::Undo),
            ["redo"] => Ok(EditStep::Redo),
            _ => Err(format!("Unknown edit step '{}'", s)),
        }
    }
}

/// Run `steps` against `history` in order. The starting plan must pass
/// [`validate_plan`]. Undo/redo with nothing to restore are skipped with a
/// warning; a refused replacement aborts the session.
fn run_edit_steps(history: &mut EditHistory, steps: &[EditStep]) -> Result<()> {
    validate_plan(history.current()).map_err(|e| anyhow!("Refusing to edit an inconsistent plan: {}", e))?;
    for step in steps {
        match step {
            EditStep::Replace(id, kind) => {
                history
                    .apply(|t| replace_node(t, *id, kind.clone()))
                    .with_context(|| format!("Cannot replace node {} with {}", id, kind))?;
            }
            EditStep::Optimize => {
                history.apply(|t| Ok(optimize_space(t.clone())))?;
            }
            EditStep::Undo => {
                if !history.undo() {
                    warn!("Nothing to undo");
                }
            }
            EditStep::Redo => {
                if !history.redo() {
                    warn!("Nothing to redo");
                }
            }
        }
    }
    log::debug!("Edit session done (undo available: {}, redo available: {})", history.can_undo(), history.can_redo());
    Ok(())
}

fn load_config(cli: &Cli) -> Result<PlannerConfig> {
    let path = cli.config.clone().unwrap_or_else(|| PlannerConfig::config_path_from_plan(&cli.plan));
    let mut config = match &cli.config {
        Some(_) => PlannerConfig::load(&path),
        None => PlannerConfig::load_or_default(&path),
    }
    .map_err(|e| anyhow!("{} ({})", e, path.display()))?;

    if let Some(signal) = cli.signal {
        config.base_station_signal = signal;
    }
    if let Some(mhz) = cli.frequency {
        config.frequency = Frequency::from_mhz(mhz).ok_or_else(|| anyhow!("Unsupported frequency: {} MHz", mhz))?;
    }
    Ok(config)
}

fn write_plan(topology: &Topology, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => save_plan(topology, path),
        None => {
            println!("{}", plan_to_json(topology)?);
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("rf_planner"), if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .init();

    let config = load_config(&cli)?;
    let topology = load_plan(&cli.plan)?;

    match &cli.command {
        Command::Compute { json, node } => {
            for issue in plan_issues(&topology) {
                warn!("{}", issue);
            }
            if let Some(id) = node {
                if topology.find(*id).is_none() {
                    bail!("Node {} not found in {}", id, cli.plan.display());
                }
                let power = power_at(&topology, *id, config.base_station_signal, config.frequency);
                println!("Node {}: {:.2} dBm", id, power);
                return Ok(());
            }
            let powers = compute_signal_power(&topology, config.base_station_signal, config.frequency);
            let report = SignalReport::build(&topology, &powers, &config);
            if *json {
                println!("{}", serde_json::to_string_pretty(&report).context("Failed to encode report")?);
            } else {
                println!("{}", report);
            }
        }
        Command::Replace {
            node_id,
            kind,
            output,
            no_optimize,
        } => {
            let mut steps = vec![EditStep::Replace(*node_id, kind.clone())];
            if !no_optimize {
                steps.push(EditStep::Optimize);
            }
            let mut history = EditHistory::new(topology, config.history_capacity);
            run_edit_steps(&mut history, &steps)?;
            info!("Replaced node {} with {}", node_id, kind);
            write_plan(history.current(), output.as_deref())?;
        }
        Command::Optimize { output } => {
            let before = (topology.row_count(), topology.col_count());
            let optimized = optimize_space(topology);
            info!(
                "Grid compacted from {}x{} to {}x{}",
                before.0,
                before.1,
                optimized.row_count(),
                optimized.col_count()
            );
            write_plan(&optimized, output.as_deref())?;
        }
        Command::Edit { steps, output } => {
            let steps = steps.iter().map(|s| s.parse::<EditStep>()).collect::<Result<Vec<_>, _>>().map_err(|e| anyhow!(e))?;
            let mut history = EditHistory::new(topology, config.history_capacity);
            run_edit_steps(&mut history, &steps)?;
            info!("Applied {} edit steps", steps.len());
            write_plan(history.current(), output.as_deref())?;
        }
        Command::Validate => {
            let issues = plan_issues(&topology);
            if issues.is_empty() {
                println!("{}: no issues", cli.plan.display());
            } else {
                for issue in &issues {
                    println!("{}", issue);
                }
                bail!("{} issue(s) found in {}", issues.len(), cli.plan.display());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::node::Ways;
    use crate::network::{Node, Position};

    #[test]
    fn parses_edit_steps() {
        assert_eq!(
            "replace 4 splitter3".parse::<EditStep>(),
            Ok(EditStep::Replace(4, NodeKind::Splitter { ways: Ways::Three }))
        );
        assert_eq!(" undo ".parse::<EditStep>(), Ok(EditStep::Undo));
        assert!("replace x antenna".parse::<EditStep>().is_err());
        assert!("replace 1 splitter9".parse::<EditStep>().is_err());
        assert!("rotate".parse::<EditStep>().is_err());
    }

    #[test]
    fn edit_session_replays_undo_and_redo() {
        let start = Topology::new(1, 1).place(Position::new(0, 0), Node::new(0, NodeKind::Antenna));
        let mut history = EditHistory::new(start.clone(), 10);
        let steps = [
            EditStep::Replace(0, NodeKind::Splitter { ways: Ways::Two }),
            EditStep::Undo,
            EditStep::Undo,
            EditStep::Redo,
        ];
        run_edit_steps(&mut history, &steps).unwrap();
        assert_eq!(history.current().len(), 3);

        let steps = [EditStep::Replace(0, NodeKind::Antenna), EditStep::Optimize];
        run_edit_steps(&mut history, &steps).unwrap();
        assert_eq!(history.current(), &start);
    }

    #[test]
    fn refused_step_aborts_session() {
        let start = Topology::new(1, 1).place(Position::new(0, 0), Node::new(0, NodeKind::Antenna));
        let mut history = EditHistory::new(start, 10);
        let steps = [EditStep::Replace(7, NodeKind::Load), EditStep::Optimize];
        assert!(run_edit_steps(&mut history, &steps).is_err());
        assert!(!history.can_undo());
    }

    #[test]
    fn inconsistent_plan_is_not_edited() {
        let start = Topology::new(1, 2)
            .place(Position::new(0, 0), Node::new(0, NodeKind::Antenna))
            .place(Position::new(0, 1), Node::new(1, NodeKind::Antenna).with_parent(1));
        let mut history = EditHistory::new(start, 10);
        assert!(run_edit_steps(&mut history, &[EditStep::Optimize]).is_err());
        assert!(!history.can_undo());
    }

    #[test]
    fn cli_accepts_negative_signal() {
        let cli = Cli::try_parse_from(["rf-planner", "plan.json", "--signal", "-5", "compute", "--json"]).unwrap();
        assert_eq!(cli.signal, Some(-5.0));
        assert!(matches!(cli.command, Command::Compute { json: true, node: None }));
    }
}
