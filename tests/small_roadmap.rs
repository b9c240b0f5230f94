//! Planner scenarios on a tiny fixed roadmap.
//!
//! Four roadmap nodes on a unit square, S at the origin and the goal G
//! diagonally opposite. The A side is cheap (baseline costs 1 + 1), the B
//! side expensive (1 + 10). The simulator runs noise-free so controller
//! executions are deterministic up to particle start scatter.
//!
//! ```text
//!   B(0,1) ──10── G(1,1)
//!     │             │
//!     1             1
//!     │             │
//!   S(0,0) ──1──  A(1,0)
//! ```

use marga::{
    Covariance2D, Executive, GaussianBelief, MargaConfig, MissionOutcome, PomcpPlanner, Pose2D,
    ReachTolerances, Rect, Scene, Simulator, VertexId, VertexKind,
};

struct Fixture {
    planner: PomcpPlanner,
    s: VertexId,
    a: VertexId,
    b: VertexId,
    g: VertexId,
}

fn test_config() -> MargaConfig {
    let mut config = MargaConfig::default();
    config.seed = 1234;
    config.noise_scale = 0.0;
    config.pomcp.num_particles = 8;
    config.pomcp.max_depth = 2;
    config.pomcp.max_reach_depth = 40;
    // one invocation covers a whole unit edge (8 tracking steps + slack)
    config.pomcp.rollout_steps = 12;
    config.pomcp.cov_convergence_rate = 0.9;
    config.pomcp.heur_pos_step = 1.0;
    config.pomcp.heur_ori_step = 1.0;
    config.pomcp.inflation_for_approx_stab_cost = 1.0;
    config.pomcp.obstacle_cost_to_go = 1000.0;
    config.motion.dt = 0.25;
    config.motion.max_linear_vel = 0.5;
    config.motion.max_angular_vel = 1.0;
    config.controller.node_reached_distance = 0.15;
    config.controller.max_trajectory_deviation = 2.0;
    // one full-edge invocation costs about one unit, the scale of the
    // baseline cost table
    config.cost.time_cost_weight = 1.0 / 12.0;
    config.reach = ReachTolerances {
        pos: 0.15,
        ori: 0.5,
        cov: 0.02,
        relax_multiplier: 2.0,
    };
    config.executive.max_iterations = 300;
    config
}

fn build_fixture(config: MargaConfig) -> Fixture {
    let s_pose = Pose2D::new(0.0, 0.0, 0.0);
    let a_pose = Pose2D::new(1.0, 0.0, 0.0);
    let b_pose = Pose2D::new(0.0, 1.0, 0.0);
    let g_pose = Pose2D::new(1.0, 1.0, 0.0);

    let scene = Scene::new(Rect::new(-0.5, -0.5, 1.5, 1.5));
    let beacons = vec![
        s_pose.position(),
        a_pose.position(),
        b_pose.position(),
        g_pose.position(),
    ];
    let sim = Simulator::new(
        scene,
        config.motion.clone(),
        config.observation.clone(),
        beacons,
        s_pose,
        config.noise_scale,
        config.seed,
    );

    let mut planner = PomcpPlanner::new(config, sim, 1.1);

    let stationary = Covariance2D::diagonal(0.001, 0.001, 0.001);
    let start_cov = Covariance2D::diagonal(0.0004, 0.0004, 0.0004);
    let s = planner.add_firm_node(GaussianBelief::new(s_pose, start_cov));
    let a = planner.add_firm_node(GaussianBelief::new(a_pose, stationary));
    let b = planner.add_firm_node(GaussianBelief::new(b_pose, stationary));
    let g = planner.add_firm_node(GaussianBelief::new(g_pose, stationary));

    let e_sa = planner.add_baseline_edge(s, a, 1.0);
    let _e_sb = planner.add_baseline_edge(s, b, 1.0);
    let e_ag = planner.add_baseline_edge(a, g, 1.0);
    let e_bg = planner.add_baseline_edge(b, g, 10.0);

    let roadmap = planner.roadmap_mut();
    roadmap.set_start(s);
    roadmap.set_goal(g);
    roadmap.set_feedback_edge(s, e_sa);
    roadmap.set_feedback_edge(a, e_ag);
    roadmap.set_feedback_edge(b, e_bg);
    roadmap.set_baseline_cost_to_go(g, 0.0);
    roadmap.set_baseline_cost_to_go(a, 1.0);
    roadmap.set_baseline_cost_to_go(b, 10.0);
    roadmap.set_baseline_cost_to_go(s, 2.0);

    Fixture { planner, s, a, b, g }
}

fn action_cost(planner: &PomcpPlanner, v: VertexId, q: VertexId) -> f64 {
    planner
        .graph()
        .action_stats(v, q)
        .expect("action statistics present")
        .cost_to_go
}

#[test]
fn test_choose_action_prefers_cheap_branch() {
    let mut config = test_config();
    config.pomcp.num_particles = 1;
    let mut fx = build_fixture(config);

    // with the action set materialized and no visits yet, the UCB bonus is
    // zero and the single particle descends through the seed argmin: A
    assert!(fx.planner.expand_actions(fx.s));
    let edge = fx.planner.choose_action(fx.s).unwrap();

    assert_eq!(
        fx.planner.graph().edge_target(edge),
        fx.a,
        "the branch with the cheap baseline cost-to-go must win"
    );
    // the A branch was backed up with real execution costs and still beats
    // the untouched heuristic seed of the B branch
    let q_a = action_cost(&fx.planner, fx.s, fx.a);
    let q_b = action_cost(&fx.planner, fx.s, fx.b);
    assert!(fx.planner.graph().action_stats(fx.s, fx.a).unwrap().visits >= 1.0);
    assert!(q_a < q_b, "Q(S,A) = {} must beat Q(S,B) = {}", q_a, q_b);
}

#[test]
fn test_min_cost_invariant_holds_after_search() {
    let mut fx = build_fixture(test_config());
    let _ = fx.planner.choose_action(fx.s).unwrap();

    let j = fx.planner.graph().min_cost_to_go(fx.s);
    let min_q = fx
        .planner
        .graph()
        .actions(fx.s)
        .iter()
        .filter_map(|&q| fx.planner.graph().action_stats(fx.s, q))
        .map(|stats| stats.cost_to_go)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(j, min_q, "J(h) must equal min_q Q(h,q) after backups");
}

#[test]
fn test_obstacle_penalty_redirects_to_expensive_branch() {
    let mut config = test_config();
    config.pomcp.num_particles = 10;
    let mut fx = build_fixture(config);

    // materialize the root actions first, then wall off the S->A corridor;
    // every execution along it now collides within the first invocation
    assert!(fx.planner.expand_actions(fx.s));
    fx.planner
        .simulator_mut()
        .scene_mut()
        .add_obstacle(Rect::new(0.2, -0.5, 0.3, 0.6));

    let edge = fx.planner.choose_action(fx.s).unwrap();

    let j_obs = fx.planner.config().pomcp.obstacle_cost_to_go;
    assert!(
        action_cost(&fx.planner, fx.s, fx.a) >= j_obs * 0.9,
        "collisions must drive Q(S,A) toward the obstacle penalty, got {}",
        action_cost(&fx.planner, fx.s, fx.a)
    );
    assert_eq!(fx.planner.graph().edge_target(edge), fx.b);
    let misses = fx
        .planner
        .graph()
        .action_stats(fx.s, fx.a)
        .unwrap()
        .misses;
    assert!(misses >= 1.0);
}

#[test]
fn test_tree_reuse_preserves_statistics() {
    let mut fx = build_fixture(test_config());
    // materialize the actions, then let several particles build subtrees:
    // the first follows the seed argmin through A, the second is forced
    // through B by the unvisited-action bonus
    assert!(fx.planner.expand_actions(fx.s));
    let _ = fx.planner.choose_action(fx.s).unwrap();

    let child = fx
        .planner
        .graph()
        .obs_child(fx.s, fx.a)
        .expect("simulation created the observation child for A");
    let sibling = fx
        .planner
        .graph()
        .obs_child(fx.s, fx.b)
        .expect("exploration created the observation child for B");
    let visits_before = fx.planner.graph().n_visits(child);

    // the executive commits to A and lands within reach of it
    let new_belief = GaussianBelief::new(
        Pose2D::new(0.95, 0.0, 0.0),
        Covariance2D::diagonal(0.0005, 0.0005, 0.0005),
    );
    let new_root = fx.planner.advance_root(fx.s, fx.a, new_belief);

    assert_eq!(new_root, child, "the observation child is promoted to root");
    assert_eq!(fx.planner.graph().n_visits(new_root), visits_before);
    assert_eq!(fx.planner.graph().belief(new_root).mean, new_belief.mean);

    // every sibling branch is gone
    assert!(fx.planner.graph().is_pruned(sibling));
    assert!(!fx.planner.graph().is_pruned(new_root));
    // the roadmap start and the roadmap vertices survive pruning
    assert!(!fx.planner.graph().is_pruned(fx.s));
    assert!(!fx.planner.graph().is_pruned(fx.a));
}

#[test]
fn test_heuristic_seed_overwritten_by_first_backup() {
    let mut config = test_config();
    config.pomcp.num_particles = 1;
    let mut fx = build_fixture(config);

    assert!(fx.planner.expand_actions(fx.s));
    let seed = fx.planner.approx_edge_cost(fx.s, fx.a)
        + fx.planner.cost_to_go_with_approx_stab(fx.a);
    assert!((action_cost(&fx.planner, fx.s, fx.a) - seed).abs() < 1e-9);

    let _ = fx.planner.choose_action(fx.s).unwrap();

    let stats = fx.planner.graph().action_stats(fx.s, fx.a).unwrap();
    assert_eq!(stats.visits, 1.0, "the single particle descends through A");
    assert!(
        (stats.cost_to_go - seed).abs() > 1e-6,
        "the first backup must replace the heuristic seed"
    );
}

#[test]
fn test_pruning_bounds_live_vertices() {
    let mut config = test_config();
    config.pomcp.num_particles = 2;
    let max_reach = config.pomcp.max_reach_depth as usize;
    let particles = config.pomcp.num_particles;
    let mut fx = build_fixture(config);

    let firm_count = fx.planner.graph().firm_vertex_count();
    let bound = firm_count + particles * max_reach + 16;

    let mut root = fx.s;
    for cycle in 0..100 {
        let edge = fx.planner.choose_action(root).unwrap();
        let q = fx.planner.graph().edge_target(edge);
        // commit: the robot arrives at the target's stationary belief
        let arrived = *fx.planner.graph().belief(q);
        root = fx.planner.advance_root(root, q, arrived);

        let live = fx.planner.graph().live_vertex_count();
        assert!(
            live <= bound,
            "cycle {}: {} live vertices exceeds bound {}",
            cycle,
            live,
            bound
        );
    }
}

#[test]
fn test_rollout_weights_switch_between_reach_modes() {
    let mut config = test_config();
    config.pomcp.c_exploit_rollout_within_reach = 1.0;
    config.pomcp.cost_to_go_regulator_within_reach = 1.0;
    config.pomcp.c_exploit_rollout_out_of_reach = 4.0;
    config.pomcp.cost_to_go_regulator_out_of_reach = 0.5;
    config.pomcp.n_eps_for_is_reached = 3.0;
    let mut fx = build_fixture(config);

    let draws = 10_000usize;
    let tolerance = 0.03;

    // within reach of A (0.3 < 3 * 0.15)
    let near = fx.planner.graph_mut().add_vertex(
        GaussianBelief::new(
            Pose2D::new(0.7, 0.0, 0.0),
            Covariance2D::diagonal(0.0004, 0.0004, 0.0004),
        ),
        VertexKind::Pomcp,
    );
    assert!(fx.planner.expand_actions(near));
    check_weight_formula(&mut fx.planner, near, 1.0, 1.0, draws, tolerance);

    // out of reach of every node (all distances > 0.45)
    let far = fx.planner.graph_mut().add_vertex(
        GaussianBelief::new(
            Pose2D::new(0.45, 0.45, 0.0),
            Covariance2D::diagonal(0.0004, 0.0004, 0.0004),
        ),
        VertexKind::Pomcp,
    );
    assert!(fx.planner.expand_actions(far));
    check_weight_formula(&mut fx.planner, far, 4.0, 0.5, draws, tolerance);
}

/// Assert the empirical rollout-action distribution matches
/// `w = 1 / (Q^exponent + regulator)` for the given constants.
fn check_weight_formula(
    planner: &mut PomcpPlanner,
    v: VertexId,
    exponent: f64,
    regulator: f64,
    draws: usize,
    tolerance: f64,
) {
    let actions = planner.graph().actions(v);
    assert!(actions.len() >= 2, "need several actions to compare weights");

    let weights: Vec<f64> = actions
        .iter()
        .map(|&q| {
            let cost = planner.graph().action_stats(v, q).unwrap().cost_to_go;
            1.0 / (cost.powf(exponent) + regulator)
        })
        .collect();
    let total: f64 = weights.iter().sum();

    let mut counts = vec![0usize; actions.len()];
    for _ in 0..draws {
        let picked = planner.select_rollout_action(v).unwrap();
        let idx = actions.iter().position(|&q| q == picked).unwrap();
        counts[idx] += 1;
    }

    for (i, &q) in actions.iter().enumerate() {
        let expected = weights[i] / total;
        let observed = counts[i] as f64 / draws as f64;
        assert!(
            (observed - expected).abs() < tolerance,
            "action {:?}: observed {:.3}, expected {:.3}",
            q,
            observed,
            expected
        );
    }
}

#[test]
fn test_choose_action_idempotent_with_zero_particles() {
    let mut fx = build_fixture(test_config());
    let first = fx.planner.choose_action(fx.s).unwrap();
    let target_first = fx.planner.graph().edge_target(first);

    let snapshot: Vec<(VertexId, f64, f64, f64)> = fx
        .planner
        .graph()
        .actions(fx.s)
        .iter()
        .map(|&q| {
            let stats = fx.planner.graph().action_stats(fx.s, q).unwrap();
            (q, stats.visits, stats.misses, stats.cost_to_go)
        })
        .collect();
    let visits = fx.planner.graph().n_visits(fx.s);
    let j = fx.planner.graph().min_cost_to_go(fx.s);

    fx.planner.config_mut().pomcp.num_particles = 0;
    let second = fx.planner.choose_action(fx.s).unwrap();

    assert_eq!(fx.planner.graph().edge_target(second), target_first);
    assert_eq!(fx.planner.graph().n_visits(fx.s), visits);
    assert_eq!(fx.planner.graph().min_cost_to_go(fx.s), j);
    for (q, v, m, c) in snapshot {
        let stats = fx.planner.graph().action_stats(fx.s, q).unwrap();
        assert_eq!(stats.visits, v);
        assert_eq!(stats.misses, m);
        assert_eq!(stats.cost_to_go, c);
    }
}

#[test]
fn test_actions_only_target_roadmap_vertices() {
    let mut fx = build_fixture(test_config());
    let _ = fx.planner.choose_action(fx.s).unwrap();

    let graph = fx.planner.graph();
    for raw in 0..graph.vertex_count() as u32 {
        let v = VertexId(raw);
        if graph.is_pruned(v) {
            continue;
        }
        for q in graph.actions(v) {
            assert_eq!(
                graph.vertex(q).kind,
                VertexKind::Firm,
                "actions must aim at roadmap vertices only"
            );
        }
    }
}

#[test]
fn test_executive_reaches_goal() {
    let fx = build_fixture(test_config());
    let g = fx.g;
    let mut executive = Executive::new(fx.planner).unwrap();

    let outcome = executive.run().unwrap();
    assert_eq!(outcome, MissionOutcome::ReachedGoal);

    let metrics = executive.metrics();
    assert!(!metrics.cost_history.is_empty());
    assert!(metrics.final_cost().unwrap().time_step > 0);
    assert!(!metrics.velocity_history.is_empty());

    // the simulated robot physically stands near the goal
    let true_state = executive.planner().simulator().true_state();
    let goal_pose = executive.planner().graph().belief(g).mean;
    assert!(true_state.planar_distance(&goal_pose) < 0.3);
}
