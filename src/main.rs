mod logging;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use hianime::catalog::{AnimeSummary, CatalogClient, SearchResultPage};
use hianime::config::Config;
use hianime::view::{AnimeDetailsView, DataView, HealthView, HomeFeedView, LoadState, SearchView};

#[derive(Parser, Debug)]
#[command(name = "hianime")]
#[command(about = "Browse the HiAnime catalog from the terminal")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/hianime/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// API base URL, overriding config and HIANIME_BASE_URL
  #[arg(long)]
  base_url: Option<String>,

  /// Do not read or write the response cache
  #[arg(long)]
  no_cache: bool,

  /// Write logs to a daily file instead of stderr
  #[arg(long)]
  log_file: bool,

  /// Print results as JSON
  #[arg(long)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Spotlight, trending and top airing lists
  Home {
    /// Skip the cache and fetch a fresh feed
    #[arg(long)]
    refresh: bool,
  },
  /// Details of one anime
  Info { id: String },
  /// Search the catalog
  Search {
    query: String,
    /// First page to fetch
    #[arg(long, default_value_t = 1)]
    page: u32,
    /// Number of consecutive pages to fetch
    #[arg(long, default_value_t = 1)]
    pages: u32,
  },
  /// Check whether the API answers
  Health,
  /// Remove all cached responses
  ClearCache,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = logging::init(args.log_file)?;

  let mut config = Config::load(args.config.as_deref())?.with_base_url_override(args.base_url);
  if args.no_cache {
    config.cache.enabled = false;
  }

  let client = CatalogClient::from_config(&config)?;
  info!(base_url = %client.base_url(), "catalog client ready");

  match args.command {
    Command::Home { refresh } => {
      let mut home = HomeFeedView::new(client);
      if refresh {
        home.refresh();
      } else {
        home.load();
      }
      home.changed().await;
      check(home.view(), "home feed")?;

      if args.json {
        print_json(home.view().data())?;
      } else {
        println!("Spotlight");
        for entry in home.spotlight() {
          println!("  #{:<3} {}", entry.rank, summary_line(&entry.anime));
        }
        println!("Trending");
        for anime in home.trending() {
          println!("       {}", summary_line(anime));
        }
        println!("Top airing today");
        for entry in home.top_airing() {
          println!("  #{:<3} {}", entry.rank, summary_line(&entry.anime));
        }
        if let Some(at) = home.last_updated() {
          println!("Fetched {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
      }
    }
    Command::Info { id } => {
      let mut details = AnimeDetailsView::new(client);
      details.set_anime_id(Some(id.as_str()));
      details.changed().await;
      check(details.view(), "anime details")?;

      if args.json {
        print_json(details.anime())?;
      } else {
        print_details(details.anime());
      }
    }
    Command::Search { query, page, pages } => {
      let mut search = SearchView::new(client);
      search.search(&query, page.max(1));
      search.changed().await;
      check(search.view(), "search results")?;
      emit_page(args.json, search.view().data())?;

      for _ in 1..pages {
        if !search.has_next_page() {
          break;
        }
        search.load_next_page();
        search.changed().await;
        check(search.view(), "search results")?;
        emit_page(args.json, search.view().data())?;
      }
    }
    Command::Health => {
      let mut health = HealthView::new(client);
      health.check_health();
      health.changed().await;

      if args.json {
        print_json(health.report())?;
      } else {
        match health.report().error.as_deref() {
          Some(error) => println!("{:?}: {}", health.status(), error),
          None => println!("{:?}", health.status()),
        }
      }

      if !health.is_healthy() {
        return Err(eyre!("API is not healthy"));
      }
    }
    Command::ClearCache => {
      let removed = client.clear_cache();
      println!("Removed {} cached entries", removed);
    }
  }

  Ok(())
}

/// Turn a failed view into an error; warn when showing cached data.
fn check<T>(view: &DataView<T>, what: &str) -> Result<()> {
  let error = view.error().unwrap_or("unknown error");
  match view.state() {
    LoadState::Error => Err(eyre!("Failed to load {}: {}", what, error)),
    LoadState::Stale => {
      warn!("Showing cached {} ({})", what, error);
      Ok(())
    }
    _ => Ok(()),
  }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn emit_page(json: bool, page: &SearchResultPage) -> Result<()> {
  if json {
    return print_json(page);
  }

  println!(
    "Page {}/{} ({} results)",
    page.page, page.total_pages, page.total_results
  );
  for anime in &page.results {
    println!("  {}", summary_line(anime));
  }
  Ok(())
}

fn summary_line(anime: &AnimeSummary) -> String {
  format!(
    "{} [{}] {} eps, {:.1}  ({})",
    anime.title, anime.kind, anime.total_episodes, anime.rating, anime.id
  )
}

fn print_details(anime: &AnimeSummary) {
  println!("{}", anime.title);
  println!("  id:        {}", anime.id);
  println!("  type:      {}", anime.kind);
  println!("  status:    {}", anime.status);
  println!("  rating:    {:.2}", anime.rating);
  println!("  episodes:  {}", anime.total_episodes);
  if let Some(year) = anime.year {
    println!("  year:      {}", year);
  }
  if let Some(minutes) = anime.duration_minutes {
    println!("  duration:  {}m", minutes);
  }
  if !anime.genres.is_empty() {
    println!("  genres:    {}", anime.genres.join(", "));
  }
  if !anime.studios.is_empty() {
    println!("  studios:   {}", anime.studios.join(", "));
  }
  println!("  audio:     {}", anime.audio_track);
  println!("  poster:    {}", anime.poster_url);
  println!();
  println!("{}", anime.description);
}
