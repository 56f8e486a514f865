use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use data_loader::parser::{parse_correlation_matrix, write_correlation_matrix};
use data_loader::{CorrelationMatrix, Dataset, MenuSource, MenuTable, PreferenceTable};
use recommender::{
    align, analyze_user, build_correlation_matrix, category_preferences, exploratory_picks,
    group_summary, matrix_matches_menus, most_similar, preference_summary,
    CollaborativeRecommender, ContentRecommender, RecommendPolicy,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// MenuMate - taste profiler and group menu recommender
#[derive(Parser)]
#[command(name = "menu-mate")]
#[command(about = "Menu recommendations for groups from a food preference survey", long_about = None)]
struct Cli {
    /// Menu details CSV
    #[arg(long, default_value = "data/processed_menu_details.csv")]
    menu_file: PathBuf,

    /// Preference survey CSV
    #[arg(long, default_value = "data/processed_user_data.csv")]
    user_file: PathBuf,

    /// Precomputed correlation matrix CSV
    #[arg(long, default_value = "data/menu_correlation_matrix.csv")]
    matrix_file: PathBuf,

    /// Menu file holds raw multi-valued fields instead of 0/1 columns
    #[arg(long)]
    raw_menus: bool,

    /// JSON file with scoring policy overrides
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Correlation to liked menus blended with raw preference
    Collaborative,
    /// Attribute similarity to the group's taste profile
    Content,
}

#[derive(Subcommand)]
enum Commands {
    /// Favorite and disliked menus of one user
    User {
        #[arg(long)]
        name: String,

        /// Number of representative favorites to show
        #[arg(long, default_value = "5")]
        top_n: usize,
    },

    /// Menus a group rates highly on average
    Group {
        /// Comma-separated user names
        #[arg(long, value_delimiter = ',', required = true)]
        names: Vec<String>,

        /// Keep menus whose mean score is above this value
        #[arg(long, default_value = "2.5")]
        threshold: f64,

        #[arg(long, default_value = "10")]
        top_n: usize,
    },

    /// Preference summary and per-category averages of one user
    Summary {
        #[arg(long)]
        name: String,
    },

    /// Ranked recommendations for a group
    Recommend {
        /// Comma-separated user names
        #[arg(long, value_delimiter = ',', required = true)]
        names: Vec<String>,

        #[arg(long, value_enum, default_value = "collaborative")]
        mode: Mode,

        /// Number of recommendations to return
        #[arg(long, default_value = "5")]
        limit: usize,

        /// Reasons shown per recommendation
        #[arg(long)]
        reasons: Option<usize>,

        /// Weight of the correlation component (0..=1)
        #[arg(long)]
        weight: Option<f64>,

        #[arg(long)]
        diversity_penalty: Option<f64>,

        /// Minimum score for a menu to count as liked
        #[arg(long)]
        liked_threshold: Option<u8>,

        /// Extra random picks outside the ranked list
        #[arg(long, default_value = "0")]
        explore: usize,

        #[arg(long, default_value = "42")]
        seed: u64,

        /// Rebuild the correlation matrix instead of reading the matrix file
        #[arg(long)]
        rebuild_matrix: bool,
    },

    /// Build the correlation matrix from the menu details and save it
    BuildMatrix,

    /// Menus most similar to a given menu
    Similar {
        #[arg(long)]
        menu: String,

        #[arg(long, default_value = "3")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut policy = match &cli.policy {
        Some(path) => RecommendPolicy::from_json_file(path)
            .with_context(|| format!("Failed to load policy from {}", path.display()))?,
        None => RecommendPolicy::default(),
    };

    let start = Instant::now();
    let source = if cli.raw_menus {
        MenuSource::Raw
    } else {
        MenuSource::Processed
    };
    let dataset = Dataset::load_from_files(&cli.menu_file, &cli.user_file, source)
        .context("Failed to load survey dataset")?;
    let (menus, preferences) =
        align(&dataset.menus, &dataset.preferences).context("Failed to align menu identifiers")?;
    if !cli.json {
        println!(
            "{} Loaded {} menus and {} users in {:?}",
            "✓".green(),
            menus.len(),
            preferences.users().len(),
            start.elapsed()
        );
    }

    match cli.command {
        Commands::User { name, top_n } => {
            handle_user(&menus, &preferences, &policy, &name, top_n, cli.json)?
        }
        Commands::Group {
            names,
            threshold,
            top_n,
        } => handle_group(&menus, &preferences, &names, threshold, top_n, cli.json)?,
        Commands::Summary { name } => handle_summary(&menus, &preferences, &name, cli.json)?,
        Commands::Recommend {
            names,
            mode,
            limit,
            reasons,
            weight,
            diversity_penalty,
            liked_threshold,
            explore,
            seed,
            rebuild_matrix,
        } => {
            if let Some(reasons) = reasons {
                policy.top_reasons = reasons;
            }
            if let Some(weight) = weight {
                policy.correlation_weight = weight;
            }
            if let Some(penalty) = diversity_penalty {
                policy.diversity_penalty = penalty;
            }
            if let Some(threshold) = liked_threshold {
                policy.liked_threshold = threshold;
            }
            policy.validate().context("Invalid scoring policy")?;

            let request = RecommendRequest {
                names: &names,
                mode,
                limit,
                explore,
                seed,
                matrix_file: &cli.matrix_file,
                rebuild_matrix,
            };
            handle_recommend(menus, preferences, policy, request, cli.json)?
        }
        Commands::BuildMatrix => handle_build_matrix(&menus, &cli.matrix_file, cli.json)?,
        Commands::Similar { menu, limit } => {
            let matrix = load_or_build_matrix(&cli.matrix_file, &menus)?;
            handle_similar(&matrix, &menu, limit, cli.json)?
        }
    }

    Ok(())
}

/// Read the saved matrix, building one in memory when the file is absent or
/// was saved for a different menu set
fn load_or_build_matrix(path: &Path, menus: &MenuTable) -> Result<CorrelationMatrix> {
    if !path.exists() {
        warn!(
            "No correlation matrix at {}, building one in memory",
            path.display()
        );
        return Ok(build_correlation_matrix(menus)?);
    }

    info!("Reading correlation matrix from {}", path.display());
    let matrix = parse_correlation_matrix(path)
        .with_context(|| format!("Failed to read correlation matrix {}", path.display()))?;
    if matrix_matches_menus(&matrix, menus) {
        return Ok(matrix);
    }
    warn!(
        "Correlation matrix at {} covers {} menus but the details list {}; rebuilding (run build-matrix to refresh the file)",
        path.display(),
        matrix.len(),
        menus.len()
    );
    Ok(build_correlation_matrix(menus)?)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Handle the 'user' command
fn handle_user(
    menus: &MenuTable,
    preferences: &PreferenceTable,
    policy: &RecommendPolicy,
    name: &str,
    top_n: usize,
    json: bool,
) -> Result<()> {
    let analysis = analyze_user(name, preferences, menus, policy.profile_threshold, top_n)?;
    if json {
        return print_json(&analysis);
    }

    println!("{}", format!("User: {}", analysis.user).bold().blue());
    println!("{}", "Representative favorites:".bold());
    for menu in &analysis.favorite_menus {
        println!("  {} {}", "•".green(), menu);
    }
    println!("{}", "Disliked menus:".bold());
    for menu in &analysis.disliked_menus {
        println!("  {} {}", "•".red(), menu);
    }
    println!("{}", "Strongest attributes:".bold());
    for (column, share) in analysis.favorite_attributes.strongest(top_n) {
        println!("  {} {} ({:.0}%)", "•".cyan(), column, share * 100.0);
    }
    Ok(())
}

/// Handle the 'group' command
fn handle_group(
    menus: &MenuTable,
    preferences: &PreferenceTable,
    names: &[String],
    threshold: f64,
    top_n: usize,
    json: bool,
) -> Result<()> {
    let picks = group_summary(names, preferences, menus, threshold, top_n)?;
    if json {
        return print_json(&picks);
    }

    println!(
        "{}",
        format!("Group favorites ({}):", names.join(", ")).bold().blue()
    );
    for (rank, pick) in picks.iter().enumerate() {
        let simple = if pick.simple { " [simple]" } else { "" };
        println!(
            "{}. {} ({}){} - mean {:.2}",
            (rank + 1).to_string().green(),
            pick.menu,
            pick.category,
            simple.yellow(),
            pick.mean_score
        );
    }
    Ok(())
}

/// Handle the 'summary' command
fn handle_summary(
    menus: &MenuTable,
    preferences: &PreferenceTable,
    name: &str,
    json: bool,
) -> Result<()> {
    let summary = preference_summary(name, preferences, menus)?;
    let categories = category_preferences(name, preferences, menus)?;
    if json {
        return print_json(&serde_json::json!({
            "summary": summary,
            "categories": categories,
        }));
    }

    println!("{}", format!("=== {} ===", summary.user).bold().blue());
    println!("Average score: {:.2}", summary.average);

    println!("{}", "Top menus:".bold());
    for (menu, score) in &summary.top {
        println!("  {} {}: {}", "•".green(), menu, score);
    }
    println!("{}", "Bottom menus:".bold());
    for (menu, score) in &summary.bottom {
        println!("  {} {}: {}", "•".red(), menu, score);
    }

    println!("{}", "Favorite categories:".bold());
    for (category, count) in &summary.favorite_categories {
        println!("  {} {}: {}", "•".cyan(), category, count);
    }
    for (category, counts) in &summary.favorite_attributes {
        println!("{}", format!("Favorite {}:", category.label()).bold());
        for (value, count) in counts {
            println!("  {} {}: {}", "•".cyan(), value, count);
        }
    }

    for (title, means) in [
        ("Mean score by category:", &categories.by_category),
        ("Mean score by flavor:", &categories.by_flavor),
        ("Mean score by cooking method:", &categories.by_cooking_method),
    ] {
        println!("{}", title.bold());
        for (key, mean) in means {
            println!("  {} {}: {:.2}", "•".cyan(), key, mean);
        }
    }
    Ok(())
}

struct RecommendRequest<'a> {
    names: &'a [String],
    mode: Mode,
    limit: usize,
    explore: usize,
    seed: u64,
    matrix_file: &'a Path,
    rebuild_matrix: bool,
}

/// Handle the 'recommend' command
fn handle_recommend(
    menus: MenuTable,
    preferences: PreferenceTable,
    policy: RecommendPolicy,
    request: RecommendRequest<'_>,
    json: bool,
) -> Result<()> {
    let all_menus: Vec<String> = menus.menu_names().map(str::to_string).collect();

    let (ranked, output): (Vec<String>, serde_json::Value) = match request.mode {
        Mode::Collaborative => {
            // only the collaborative scorer reads the matrix
            let matrix = if request.rebuild_matrix {
                build_correlation_matrix(&menus)?
            } else {
                load_or_build_matrix(request.matrix_file, &menus)?
            };
            let recommender = CollaborativeRecommender::new(Arc::new(preferences), Arc::new(matrix))
                .with_policy(policy);
            let recommendations = recommender.recommend(request.names, request.limit)?;
            if !json {
                println!("{}", "Recommendations:".bold().blue());
                for (rank, rec) in recommendations.iter().enumerate() {
                    println!(
                        "{}. {} - score {:.3}",
                        (rank + 1).to_string().green(),
                        rec.menu,
                        rec.score
                    );
                    println!("   {}", rec.reason_text().dimmed());
                }
            }
            (
                recommendations.iter().map(|r| r.menu.clone()).collect(),
                serde_json::to_value(&recommendations)?,
            )
        }
        Mode::Content => {
            let recommender = ContentRecommender::new(Arc::new(menus), Arc::new(preferences))
                .with_policy(policy);
            let recommendations = recommender.recommend(request.names, request.limit)?;
            if !json {
                println!("{}", "Recommendations:".bold().blue());
                for (rank, rec) in recommendations.iter().enumerate() {
                    let simple = if rec.simple { " [simple]" } else { "" };
                    println!(
                        "{}. {} ({}){} - similarity {:.3}",
                        (rank + 1).to_string().green(),
                        rec.menu,
                        rec.category,
                        simple.yellow(),
                        rec.score
                    );
                }
            }
            (
                recommendations.iter().map(|r| r.menu.clone()).collect(),
                serde_json::to_value(&recommendations)?,
            )
        }
    };

    let picks = exploratory_picks(&all_menus, &ranked, request.explore, request.seed);
    if json {
        return print_json(&recommend_json(output, &picks));
    }
    if !picks.is_empty() {
        println!("{}", "Something different:".bold().magenta());
        for menu in picks {
            println!("  {} {}", "?".magenta(), menu);
        }
    }
    Ok(())
}

/// JSON body of the 'recommend' command: ranked list plus exploratory picks
fn recommend_json(recommendations: serde_json::Value, picks: &[String]) -> serde_json::Value {
    serde_json::json!({
        "recommendations": recommendations,
        "exploratory": picks,
    })
}

/// Handle the 'build-matrix' command
fn handle_build_matrix(menus: &MenuTable, path: &Path, json: bool) -> Result<()> {
    let start = Instant::now();
    let matrix = build_correlation_matrix(menus)?;
    write_correlation_matrix(&matrix, path)
        .with_context(|| format!("Failed to write correlation matrix {}", path.display()))?;
    if json {
        return print_json(&serde_json::json!({
            "menus": matrix.len(),
            "path": path.display().to_string(),
        }));
    }
    println!(
        "{} Wrote {}x{} correlation matrix to {} in {:?}",
        "✓".green(),
        matrix.len(),
        matrix.len(),
        path.display(),
        start.elapsed()
    );
    Ok(())
}

/// Handle the 'similar' command
fn handle_similar(matrix: &CorrelationMatrix, menu: &str, limit: usize, json: bool) -> Result<()> {
    let neighbors = most_similar(matrix, menu, limit)?;
    if json {
        return print_json(&neighbors);
    }
    println!("{}", format!("Menus similar to {}:", menu).bold().blue());
    for (rank, (name, similarity)) in neighbors.iter().enumerate() {
        println!(
            "{}. {} ({:.2})",
            (rank + 1).to_string().green(),
            name,
            similarity
        );
    }
    Ok(())
}
