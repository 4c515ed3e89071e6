use std::time::{Duration, Instant};

use landmark_guess_game::{
    Advance, GameHooks, GameSession,
    catalog::LandmarkCatalog,
    config::GameConfig,
    round::Feedback,
    route::{PendingRoute, RevealPath, RouteClient},
};
use landmark_guess_lib::coordinate::Coordinate;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const REVEAL_GRACE: Duration = Duration::from_millis(300);

struct TerminalHooks;

impl GameHooks for TerminalHooks {
    fn celebrate(&mut self, feedback: Feedback) {
        match feedback {
            Feedback::Perfect => println!("*** PERFECT! ***"),
            Feedback::Good => println!("* Nice one! *"),
        }
    }
}

// Plays one session in the terminal
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=trace", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = GameConfig::from_env()?;
    let catalog = LandmarkCatalog::warsaw();
    let routes = RouteClient::new(config.route_base_url.clone(), config.route_timeout);
    let mut rng = config.rng();

    let mut session =
        GameSession::start_with_hooks(&catalog, &config.session_options(), &mut rng, Instant::now(), TerminalHooks)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let view = session.view(Instant::now());
        println!();
        println!("Round {} of {} | total score {}", view.round_number, view.round_count, view.total_score);
        println!("Find: {}", view.landmark_name);
        println!("Enter your guess as `lat, lng` within {}", view.countdown);

        let mut route = None;

        while !session.current_round().is_resolved() {
            let Some(deadline) = session.deadline() else {
                break;
            };

            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        println!("Bye!");
                        return Ok(());
                    };
                    match parse_guess(&line) {
                        Some(guess) => {
                            if session.submit_guess(guess, Instant::now()).is_ignored() {
                                println!("That guess did not count");
                            } else if let Some(guess) = session.current_round().guess() {
                                let truth = session.current_round().landmark().position;
                                route = Some(routes.spawn(guess, truth));
                            }
                        }
                        None => println!("Could not read `{}`, expected `lat, lng`", line.trim()),
                    }
                }
                _ = tokio::time::sleep_until(deadline.into()) => {
                    session.tick(Instant::now());
                }
            }
        }

        // Short head start for the route lookup
        if route.is_some() {
            tokio::time::sleep(REVEAL_GRACE).await;
        }
        print_reveal(&session, route.as_mut());

        println!("Press enter to continue");
        if lines.next_line().await?.is_none() {
            return Ok(());
        }

        match session.advance(Instant::now())? {
            Advance::NextRound(_) => continue,
            Advance::Completed(result) => {
                println!();
                println!("Game complete! Your final score: {}", result.total_score);
                return Ok(());
            }
        }
    }
}

fn print_reveal(session: &GameSession, route: Option<&mut PendingRoute>) {
    let round = session.current_round();
    let view = session.view(Instant::now());

    if round.timed_out() {
        println!("Time's up! {} scores 0 points.", view.landmark_name);
    } else if let (Some(distance), Some(score)) = (round.distance_km(), round.score()) {
        println!("{:.2} km away, {} points. {}", distance, score, view.flavor.unwrap_or_default());

        if let Some(path) = route.map(PendingRoute::reveal) {
            println!("{}", path_line(&path));
        }
    }

    for fact in view.facts {
        println!("  - {}", fact);
    }
    println!("Total score: {}", session.total_score());
}

fn path_line(path: &RevealPath) -> String {
    match path {
        RevealPath::Route(_) => format!("By road that is {:.2} km", path.distance_km()),
        RevealPath::Direct { distance_km, .. } => format!("As the crow flies: {:.2} km", distance_km),
    }
}

fn parse_guess(line: &str) -> Option<Coordinate> {
    let mut parts = line
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|part| !part.is_empty());

    let lat = parts.next()?.parse().ok()?;
    let lng = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    let guess = Coordinate::new(lat, lng);
    guess.is_valid().then_some(guess)
}

#[test]
fn parse_guess_formats() {
    assert_eq!(parse_guess("52.2497, 21.0122"), Some(Coordinate::new(52.2497, 21.0122)));
    assert_eq!(parse_guess("52.2497 21.0122"), Some(Coordinate::new(52.2497, 21.0122)));
    assert_eq!(parse_guess(" 52.2;21.0 "), Some(Coordinate::new(52.2, 21.0)));
    assert_eq!(parse_guess("52.2"), None);
    assert_eq!(parse_guess("north, east"), None);
    assert_eq!(parse_guess("1, 2, 3"), None);
    assert_eq!(parse_guess("95, 21"), None);
}

#[tokio::test]
async fn late_route_falls_back_to_straight_line() {
    let routes = RouteClient::new("http://127.0.0.1:9", Duration::from_secs(4));
    let from = Coordinate::new(52.2497, 21.0122);
    let to = Coordinate::new(52.2319, 21.0067);

    // Polled before the spawned lookup has had a chance to run
    let mut pending = routes.spawn(from, to);
    let started = Instant::now();
    let path = pending.reveal();

    assert!(started.elapsed() < Duration::from_millis(100));
    assert!(!path.is_route());
    assert_eq!(path.points(), vec![from, to]);
    assert!(path_line(&path).starts_with("As the crow flies: 2."));
}
