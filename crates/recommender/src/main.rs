//! Video Recommender - terminal rating survey
//!
//! Asks a new user to rate a handful of videos, then fits the factor model in
//! the background and prints the top recommendations.

use anyhow::{bail, Context};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use video_recommender::{
    init_logging, select_items, Dataset, RecommendationReport, RecommenderConfig, RecommenderEngine,
    UserRatings,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RecommenderConfig::load().context("failed to load configuration")?;
    init_logging(&config.logging)?;

    let engine = RecommenderEngine::new(config);
    let dataset = Arc::new(engine.load_dataset().with_context(|| {
        format!("failed to load dataset {}", engine.config().dataset.path)
    })?);

    let selected = select_items(
        dataset.themes(),
        engine.config().survey.items_to_rate,
        &mut rand::thread_rng(),
    );
    info!(items = selected.len(), "starting rating survey");

    let scale = engine.rating_scale();
    println!(
        "Please rate each video from {} to {}",
        scale.start(),
        scale.end()
    );

    let answers = collect_ratings(&engine, &dataset, &selected)?;

    let pending = engine.spawn(engine.request(Arc::clone(&dataset), answers));
    info!(request_id = %pending.request_id(), "submitted recommendation request");

    print!("Computing");
    io::stdout().flush()?;

    let wait = pending.wait();
    tokio::pin!(wait);
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    let report = loop {
        tokio::select! {
            result = &mut wait => break result?,
            _ = ticker.tick() => {
                print!(".");
                io::stdout().flush()?;
            }
        }
    };
    println!();

    if engine.config().output.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render(&report);
    }

    Ok(())
}

fn collect_ratings(
    engine: &RecommenderEngine,
    dataset: &Dataset,
    selected: &[usize],
) -> anyhow::Result<UserRatings> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut answers = UserRatings::new(dataset.num_items());

    for &item in selected {
        loop {
            print!("{} ({}): ", dataset.titles()[item], dataset.themes()[item]);
            io::stdout().flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                bail!("input closed before every video was rated");
            }

            match engine.parse_rating(&line) {
                Ok(rating) => {
                    answers.set(item, rating);
                    break;
                }
                Err(e) => eprintln!("Error: {}", e),
            }
        }
    }

    Ok(answers)
}

fn render(report: &RecommendationReport) {
    if report.recommendations.is_empty() {
        println!("No recommendations: every video is already rated.");
        return;
    }

    println!("Recommendations:");
    for (rank, rec) in report.recommendations.iter().enumerate() {
        println!("{}. {} ({}) - {:.3}", rank + 1, rec.title, rec.theme, rec.score);
    }
}
