use rand::{rngs::StdRng, Rng, SeedableRng};
use whr::{DayRating, Elo, TimeStep, UnstableRating, UsageError, WhrConfig, WholeHistoryRating, Winner};

fn shusaku_shusai() -> WholeHistoryRating {
    let mut whr = WholeHistoryRating::default();
    for (step, winner) in [
        (1, Winner::Black),
        (2, Winner::White),
        (3, Winner::White),
        (4, Winner::White),
        (4, Winner::White),
    ] {
        whr.create_game("shusaku", "shusai", winner, TimeStep(step))
            .unwrap();
    }
    whr
}

#[test]
fn test_regression() {
    let mut whr = shusaku_shusai();
    whr.iterate(50).unwrap();

    let expected = [
        (1, -102.2877, 171.7401),
        (2, -106.5366, 170.5055),
        (3, -109.6115, 170.1232),
        (4, -111.5441, 170.5737),
    ];

    let shusaku = whr.ratings_for_player("shusaku").unwrap();
    let shusai = whr.ratings_for_player("shusai").unwrap();
    assert_eq!(shusaku.len(), expected.len());
    assert_eq!(shusai.len(), expected.len());

    for ((black, white), (step, elo, stdev)) in shusaku.iter().zip(&shusai).zip(expected) {
        assert_eq!(black.time_step, TimeStep(step));
        assert!((black.elo.0 - elo).abs() < 0.01);
        assert!((black.elo_stdev.unwrap().0 - stdev).abs() < 0.01);

        assert_eq!(white.time_step, TimeStep(step));
        assert!((white.elo.0 + elo).abs() < 0.01);
        assert!((white.elo_stdev.unwrap().0 - stdev).abs() < 0.01);
    }
}

#[test]
fn test_interpolated_rating_between_days() {
    let mut whr = WholeHistoryRating::default();
    whr.create_game("a", "b", Winner::Black, TimeStep(1)).unwrap();
    whr.create_game("a", "b", Winner::White, TimeStep(11)).unwrap();
    whr.iterate(50).unwrap();

    let days = whr.ratings_for_player("a").unwrap();
    let (elo, stdev) = whr.rating_at("a", TimeStep(6)).unwrap();
    assert!((elo.0 - (days[0].elo.0 + days[1].elo.0) / 2.0).abs() < 1e-9);
    assert!(stdev.unwrap().0 > days[0].elo_stdev.unwrap().0);

    let (before, _) = whr.rating_at("a", TimeStep(-5)).unwrap();
    assert_eq!(before, days[0].elo);
    let (after, _) = whr.rating_at("a", TimeStep(100)).unwrap();
    assert_eq!(after, days[1].elo);
}

#[test]
fn test_self_game() {
    let mut whr = WholeHistoryRating::default();
    assert!(matches!(
        whr.create_game("A", "A", "B".parse().unwrap(), TimeStep(1)),
        Err(UsageError::SelfGame { .. })
    ));
}

#[test]
fn test_order_enforced() {
    let mut whr = shusaku_shusai();
    assert!(matches!(
        whr.create_game("shusaku", "other", Winner::Black, TimeStep(3)),
        Err(UsageError::OutOfOrder {
            time_step: TimeStep(3),
            latest: TimeStep(4),
            ..
        })
    ));
    assert!(whr
        .create_game("shusaku", "other", Winner::Black, TimeStep(4))
        .is_ok());
    assert!(whr
        .create_game("other", "shusai", Winner::Black, TimeStep(5))
        .is_ok());
}

#[test]
fn test_instability() {
    let mut whr = WholeHistoryRating::default();
    for _ in 0..10 {
        whr.create_game("anchor", "player", Winner::Black, TimeStep(1))
            .unwrap();
        whr.create_game("anchor", "player", Winner::White, TimeStep(1))
            .unwrap();
    }
    for _ in 0..10 {
        whr.create_handicap_game("anchor", "player", Winner::Black, TimeStep(180), Elo(600.0))
            .unwrap();
        whr.create_handicap_game("anchor", "player", Winner::White, TimeStep(180), Elo(600.0))
            .unwrap();
    }

    let err: UnstableRating = whr.iterate(10).unwrap_err();
    assert!(err.to_string().contains("anchor"));
}

fn random_history(seed: u64, players: usize, games: usize) -> WholeHistoryRating {
    let mut rng = StdRng::seed_from_u64(seed);
    let names: Vec<String> = (0..players).map(|i| format!("p{i}")).collect();
    let mut whr = WholeHistoryRating::default();
    let mut step = 0;
    for _ in 0..games {
        step += rng.gen_range(0..3);
        let black = rng.gen_range(0..players);
        let white = (black + rng.gen_range(1..players)) % players;
        let winner = if rng.gen_bool(0.5) {
            Winner::Black
        } else {
            Winner::White
        };
        whr.create_game(&names[black], &names[white], winner, TimeStep(step))
            .unwrap();
    }
    whr
}

#[test]
fn test_more_iterations_do_not_increase_gradient() {
    for seed in 0..8 {
        for n in [2, 5, 10] {
            let mut once = random_history(seed, 6, 60);
            once.iterate(n).unwrap();
            let mut twice = once.clone();
            twice.iterate(n).unwrap();

            let once = once.gradient_norm().unwrap();
            let twice = twice.gradient_norm().unwrap();
            assert!(
                twice <= once + 1e-9,
                "seed {seed}, n {n}: {twice} > {once}"
            );
        }
    }
}

#[test]
fn test_converges_to_stationary_point() {
    let mut whr = random_history(42, 8, 120);
    let passes = whr.iterate_until(2, 500, 1e-4).unwrap();
    assert!(passes < 500);
    assert!(whr.gradient_norm().unwrap() < 1e-3);
    for player in whr.players() {
        for day in player.days() {
            assert!(day.r().0.is_finite());
            assert!(day.variance().unwrap() > 0.0);
        }
    }
}

#[test]
fn test_held_out_log_likelihood() {
    let mut whr = WholeHistoryRating::default();
    for step in 1..=10 {
        let winner = if step % 3 == 0 { Winner::White } else { Winner::Black };
        whr.create_game("strong", "weak", winner, TimeStep(step)).unwrap();
        whr.create_test_game("strong", "weak", Winner::Black, TimeStep(step), Elo(0.0))
            .unwrap();
    }
    // Not scored: a single fitted day.
    whr.create_game("lonely", "weak", Winner::Black, TimeStep(11)).unwrap();
    whr.create_test_game("lonely", "weak", Winner::Black, TimeStep(11), Elo(0.0))
        .unwrap();

    whr.iterate(50).unwrap();
    assert_eq!(whr.player("strong").unwrap().test_days().len(), 10);
    assert!(whr.player("strong").unwrap().days().iter().all(|day| day.num_games() == 1));

    let ll = whr.log_likelihood_test().unwrap();
    assert!(ll.is_finite());
    assert!(ll < 0.0);
    // Better than chance, since strong mostly wins.
    assert!(ll > 21.0 * 0.5f64.ln());
}

#[test]
fn test_reconfiguration_changes_fit() {
    let mut whr = shusaku_shusai();
    whr.iterate(50).unwrap();
    let before = whr.ratings_for_player("shusai").unwrap();

    whr.set_config(WhrConfig::builder().w(300.0).build());
    whr.iterate(50).unwrap();
    let after = whr.ratings_for_player("shusai").unwrap();

    // More drift lets the late wins pull the late ratings further apart.
    let spread = |ratings: &[DayRating]| ratings[3].elo.0 - ratings[0].elo.0;
    assert!(spread(&after) > spread(&before));
}
