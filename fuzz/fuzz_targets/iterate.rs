#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use whr::{Elo, TimeStep, WhrConfig, WholeHistoryRating, Winner};

#[derive(Arbitrary, Debug)]
struct ArbitraryGame {
    black: u8,
    white: u8,
    black_wins: bool,
    days_later: u8,
    handicap: i16,
    held_out: bool,
}

#[derive(Arbitrary, Debug)]
struct History {
    w: u16,
    prior_stdev: u16,
    games: Vec<ArbitraryGame>,
    iterations: u8,
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Ok(history) = History::arbitrary(&mut u) else {
        return;
    };

    let config = WhrConfig::builder()
        .w(f64::from(history.w.max(1)))
        .prior_stdev(f64::from(history.prior_stdev.max(1)))
        .build();
    let mut whr = WholeHistoryRating::new(config);

    let mut step = 0;
    for game in history.games.iter().take(64) {
        step += i64::from(game.days_later % 8);
        let black = format!("p{}", game.black % 8);
        let white = format!("p{}", game.white % 8);
        let winner = if game.black_wins {
            Winner::Black
        } else {
            Winner::White
        };
        let handicap = Elo(f64::from(game.handicap % 1000));
        let result = if game.held_out {
            whr.create_test_game(&black, &white, winner, TimeStep(step), handicap)
        } else {
            whr.create_handicap_game(&black, &white, winner, TimeStep(step), handicap)
        };
        // Self-games are rejected, time steps never decrease.
        assert_eq!(result.is_err(), black == white);
    }

    if whr.iterate(usize::from(history.iterations % 16)).is_err() {
        return;
    }

    for player in whr.players() {
        for rating in player.ratings() {
            assert!(rating.elo.0.is_finite());
            if let Some(stdev) = rating.elo_stdev {
                assert!(!stdev.0.is_nan());
            }
        }
    }
    if let Ok(log_likelihood) = whr.log_likelihood_test() {
        assert!(!log_likelihood.is_nan());
    }
});
