//! marga-node - run the belief-space planner on a built-in demo scenario.
//!
//! The scenario is a small room with five roadmap nodes, a beacon at each
//! node, and one obstacle pinching the upper corridor. The baseline feedback
//! policy and cost-to-go table stand in for the roadmap builder's
//! dynamic-programming pass.

use clap::Parser;
use marga::{
    Covariance2D, Executive, GaussianBelief, MargaConfig, MissionOutcome, Point2D, PomcpPlanner,
    Pose2D, Rect, Scene, Simulator,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "marga-node", about = "Belief-space planner demo")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the random seed (0 = time-based)
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of search particles per action choice
    #[arg(long)]
    particles: Option<usize>,
}

/// Hand-assembled demo roadmap: S at the origin, goal G across the room,
/// a short path pinched by an obstacle and a longer open detour.
fn build_planner(config: MargaConfig) -> PomcpPlanner {
    let node_poses = [
        Pose2D::new(0.0, 0.0, 0.0), // S
        Pose2D::new(1.0, 0.0, 0.0), // A
        Pose2D::new(0.0, 1.0, 0.0), // B
        Pose2D::new(1.0, 1.0, 0.0), // M
        Pose2D::new(2.0, 1.0, 0.0), // G
    ];

    let mut scene = Scene::new(Rect::new(-0.5, -0.5, 2.5, 2.5));
    // pinch the A->M corridor so the planner has to weigh risk against length
    scene.add_obstacle(Rect::new(0.8, 0.45, 1.25, 0.62));

    let beacons: Vec<Point2D> = node_poses.iter().map(|p| p.position()).collect();
    let sim = Simulator::new(
        scene,
        config.motion.clone(),
        config.observation.clone(),
        beacons,
        node_poses[0],
        config.noise_scale,
        config.seed,
    );

    let mut planner = PomcpPlanner::new(config, sim, 1.3);

    let stationary = Covariance2D::diagonal(0.003, 0.003, 0.003);
    let ids: Vec<_> = node_poses
        .iter()
        .map(|&pose| planner.add_firm_node(GaussianBelief::new(pose, stationary)))
        .collect();
    let (s, a, b, m, g) = (ids[0], ids[1], ids[2], ids[3], ids[4]);

    // baseline edges with their DP costs
    let _e_sa = planner.add_baseline_edge(s, a, 1.2);
    let e_sb = planner.add_baseline_edge(s, b, 1.2);
    let _e_am = planner.add_baseline_edge(a, m, 1.2);
    let e_bm = planner.add_baseline_edge(b, m, 1.2);
    let e_mg = planner.add_baseline_edge(m, g, 1.2);

    let roadmap = planner.roadmap_mut();
    roadmap.set_start(s);
    roadmap.set_goal(g);
    // baseline feedback policy: the A->M corridor is blocked, so the DP pass
    // routed S through B and left A without a usable cost-to-go
    roadmap.set_feedback_edge(s, e_sb);
    roadmap.set_feedback_edge(b, e_bm);
    roadmap.set_feedback_edge(m, e_mg);
    roadmap.set_baseline_cost_to_go(g, 0.0);
    roadmap.set_baseline_cost_to_go(m, 1.2);
    roadmap.set_baseline_cost_to_go(b, 2.4);
    roadmap.set_baseline_cost_to_go(s, 3.6);

    planner
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match MargaConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                log::error!("failed to load configuration: {}", e);
                return ExitCode::from(2);
            }
        },
        None => MargaConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(particles) = args.particles {
        config.pomcp.num_particles = particles;
    }
    if let Err(e) = config.validate() {
        log::error!("invalid configuration: {}", e);
        return ExitCode::from(2);
    }

    log::info!("marga-node starting...");
    log::info!("  particles: {}", config.pomcp.num_particles);
    log::info!(
        "  horizons: tree {} / reach {}",
        config.pomcp.max_depth,
        config.pomcp.max_reach_depth
    );
    log::info!("  seed: {}", config.seed);

    let planner = build_planner(config);
    let mut executive = match Executive::new(planner) {
        Ok(e) => e,
        Err(e) => {
            log::error!("failed to assemble executive: {}", e);
            return ExitCode::from(2);
        }
    };

    let outcome = match executive.run() {
        Ok(o) => o,
        Err(e) => {
            log::error!("mission failed: {}", e);
            return ExitCode::from(2);
        }
    };

    let metrics = executive.metrics();
    if let Some(cost) = metrics.final_cost() {
        log::info!(
            "final: {} time steps, covariance cost {:.4}, total cost {:.4}",
            cost.time_step,
            cost.covariance_cost,
            cost.total_cost
        );
    }
    if let Some(&(step, count)) = metrics.nodes_reached_history.last() {
        log::info!("nodes reached: {} (last at step {})", count, step);
    }
    log::info!("velocity samples recorded: {}", metrics.velocity_history.len());

    match outcome {
        MissionOutcome::ReachedGoal => {
            log::info!("mission complete: goal belief reached");
            ExitCode::SUCCESS
        }
        MissionOutcome::Collided => {
            log::error!("mission failed: collision");
            ExitCode::from(1)
        }
        MissionOutcome::HorizonExhausted => {
            log::error!("mission failed: horizon exhausted");
            ExitCode::from(1)
        }
    }
}
