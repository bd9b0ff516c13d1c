use evasion::integrator::is_feasible_transition;
use evasion::{
    search_time_to_maneuver, search_worst_case, time_to_brake, time_to_collision, time_to_kickdown, time_to_react,
    time_to_steer, CollisionOracle, DrivableAreaOracle, ManeuverSpec, Motion, Obstacle, Pose, ReachConfig,
    ReactInputs, RectShape, Scenario, Segment, SimulationContext, StraightRoad, Trajectory, VehicleParameters,
    VehicleState,
};

const DT: f64 = 0.1;
const EGO: RectShape = RectShape { length: 4.5, width: 1.8 };

fn reference(speed: f64, steps: usize) -> Trajectory {
    Trajectory::constant_velocity(VehicleState::new(0, [0.0, 0.0], speed, 0.0), steps, DT)
}

// three lanes, the ego drives along y = 0 in the middle one
fn road() -> StraightRoad {
    StraightRoad::new([-10.0, -5.25], 0.0, 3.5, 3, 300.0).unwrap()
}

fn parked_car(x: f64, y: f64) -> Obstacle {
    Obstacle {
        id: 7,
        shape: EGO,
        motion: Motion::Static(Pose {
            position: [x, y],
            orientation: 0.0,
        }),
    }
}

// a car parked ahead, sticking 0.8 m into the ego's path from the left
fn blocked_scenario(x: f64) -> Scenario {
    Scenario {
        obstacles: vec![parked_car(x, 1.0)],
        road_boundary: Vec::new(),
    }
}

struct Fixture {
    ctx: SimulationContext,
    oracle: CollisionOracle,
    road: StraightRoad,
    reference: Trajectory,
    ttc: f64,
}

impl Fixture {
    fn new(scenario: &Scenario) -> Self {
        let reference = reference(20.0, 60);
        let ctx = SimulationContext::from_reference(VehicleParameters::default(), DT, &reference).unwrap();
        let oracle = CollisionOracle::build(scenario, None, EGO);
        let ttc = time_to_collision(&oracle, &reference, 0, DT);
        Self {
            ctx,
            oracle,
            road: road(),
            reference,
            ttc,
        }
    }

    fn inputs(&self) -> ReactInputs<'_> {
        ReactInputs {
            ctx: &self.ctx,
            oracle: &self.oracle,
            lanes: &self.road,
            reference: &self.reference,
            start_step: 0,
            ttc: self.ttc,
        }
    }
}

#[test]
fn test_steering_away_beats_braking() {
    let fx = Fixture::new(&blocked_scenario(65.0));
    assert!((fx.ttc - 3.1).abs() < 1e-9);

    let inputs = fx.inputs();
    let ttb = time_to_brake(&inputs).unwrap();
    let ttk = time_to_kickdown(&inputs).unwrap();
    let tts = time_to_steer(&inputs).unwrap();
    let ttr = time_to_react(&inputs).unwrap();

    assert!(ttb.value.is_finite() && ttb.value > 0.0);
    assert_eq!(ttk.value, f64::NEG_INFINITY);
    assert!(tts.value > ttb.value);
    assert!(tts.value < fx.ttc);
    assert_eq!(tts.maneuver, Some(ManeuverSpec::SteerRight));

    let best = ttb.value.max(ttk.value).max(tts.value);
    assert_eq!(ttr.value, best);
    assert_eq!(ttr.maneuver, Some(ManeuverSpec::SteerRight));
}

#[test]
fn test_steering_into_the_obstacle_never_helps() {
    let fx = Fixture::new(&blocked_scenario(65.0));
    let left = search_time_to_maneuver(&fx.ctx, &fx.oracle, &fx.road, &fx.reference, ManeuverSpec::SteerLeft, 0, fx.ttc)
        .unwrap();
    assert_eq!(left.value, f64::NEG_INFINITY);
    assert!(left.trajectory.is_none());
    assert!(!left.probes.is_empty());
}

#[test]
fn test_selected_trajectory_is_feasible_and_clear() {
    let fx = Fixture::new(&blocked_scenario(65.0));
    let ttr = time_to_react(&fx.inputs()).unwrap();
    let trajectory = ttr.trajectory.unwrap();

    assert_eq!(trajectory.first_step(), Some(0));
    assert!(trajectory.reaches(fx.ctx.horizon));
    assert!(!fx.oracle.collide(&trajectory));
    for w in trajectory.states().windows(2) {
        assert!(is_feasible_transition(&fx.ctx, &w[0], &w[1]));
    }
}

#[test]
fn test_closer_obstacle_leaves_less_time() {
    let far = Fixture::new(&blocked_scenario(65.0));
    let near = Fixture::new(&blocked_scenario(45.0));
    assert!(near.ttc < far.ttc);

    for maneuver in [ManeuverSpec::Brake, ManeuverSpec::SteerRight] {
        let t_far = far.inputs().search(maneuver).unwrap();
        let t_near = near.inputs().search(maneuver).unwrap();
        assert!(t_near.value <= t_far.value, "{maneuver:?}: {} > {}", t_near.value, t_far.value);
    }
}

#[test]
fn test_boundary_values_for_every_maneuver() {
    let fx = Fixture::new(&blocked_scenario(65.0));
    for maneuver in [
        ManeuverSpec::Brake,
        ManeuverSpec::Kickdown,
        ManeuverSpec::ConstantVelocity,
        ManeuverSpec::SteerLeft,
        ManeuverSpec::SteerRight,
        ManeuverSpec::LaneChangeLeft,
        ManeuverSpec::OvertakeRight,
        ManeuverSpec::TurnLeft,
    ] {
        for t0 in [0, 10, 30] {
            let late = search_time_to_maneuver(&fx.ctx, &fx.oracle, &fx.road, &fx.reference, maneuver, t0, 0.0).unwrap();
            assert_eq!(late.value, f64::NEG_INFINITY);
            let never =
                search_time_to_maneuver(&fx.ctx, &fx.oracle, &fx.road, &fx.reference, maneuver, t0, f64::INFINITY)
                    .unwrap();
            assert_eq!(never.value, f64::INFINITY);
        }
    }
}

#[test]
fn test_search_from_horizon_is_too_late() {
    let fx = Fixture::new(&blocked_scenario(65.0));
    let result =
        search_time_to_maneuver(&fx.ctx, &fx.oracle, &fx.road, &fx.reference, ManeuverSpec::Brake, 60, 1.0).unwrap();
    assert_eq!(result.value, f64::NEG_INFINITY);
    assert!(result.probes.is_empty());
}

#[test]
fn test_none_maneuver_is_rejected() {
    let fx = Fixture::new(&blocked_scenario(65.0));
    let result = search_time_to_maneuver(&fx.ctx, &fx.oracle, &fx.road, &fx.reference, ManeuverSpec::None, 0, fx.ttc);
    assert!(result.is_err());
}

#[test]
fn test_search_is_reproducible() {
    let fx = Fixture::new(&blocked_scenario(65.0));
    let first = fx.inputs().search(ManeuverSpec::SteerRight).unwrap();
    let second = fx.inputs().search(ManeuverSpec::SteerRight).unwrap();
    assert_eq!(first.value.to_bits(), second.value.to_bits());
    assert_eq!(first, second);
}

#[test]
fn test_free_road_needs_no_reaction() {
    let fx = Fixture::new(&Scenario::default());
    assert_eq!(fx.ttc, f64::INFINITY);
    let ttr = time_to_react(&fx.inputs()).unwrap();
    assert_eq!(ttr.value, f64::INFINITY);
    assert_eq!(ttr.maneuver, Some(ManeuverSpec::Brake));
}

#[test]
fn test_worst_case_against_a_wall() {
    // a wall across a two-metre corridor, 60 m ahead
    let scenario = Scenario {
        obstacles: vec![Obstacle {
            id: 3,
            shape: RectShape { length: 4.0, width: 6.0 },
            motion: Motion::Static(Pose {
                position: [62.0, 0.0],
                orientation: 0.0,
            }),
        }],
        road_boundary: vec![
            Segment::new([-10.0, -2.0], [200.0, -2.0]),
            Segment::new([-10.0, 2.0], [200.0, 2.0]),
        ],
    };
    let reference = reference(20.0, 40);
    let ctx = SimulationContext::from_reference(VehicleParameters::default(), DT, &reference).unwrap();
    let oracle = CollisionOracle::build(&scenario, None, EGO);
    let ttc = time_to_collision(&oracle, &reference, 0, DT);
    assert!((ttc - 2.9).abs() < 1e-9);

    let reach = DrivableAreaOracle::new(ctx, oracle, ReachConfig::default()).unwrap();
    let wttr = search_worst_case(&ctx, &reach, &reference, 0, ttc).unwrap();
    assert!(wttr.value.is_finite());
    assert!(wttr.value > 0.0 && wttr.value < ttc);
    assert!(wttr.maneuver.is_none());
}
