//! Command-line surface: thin glue over the meal store and the offline
//! controller. The real application surface is a UI; this plays the same
//! role of a driver issuing sequential store calls.

use chrono::{Local, NaiveDateTime, Timelike, Utc};
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use url::Url;

use crate::config::Config;
use crate::offline::{
  CacheStore, FetchRequest, HttpFetcher, MemoryCacheStore, OfflineController, Registration,
  SqliteCacheStore,
};
use crate::store::{
  types::meal_time, JsonFileStore, MealPatch, MealRecord, MealStore, MealType, MemoryStore,
  PersistedDocumentStore,
};

#[derive(Parser, Debug)]
#[command(name = "mealpal")]
#[command(about = "Offline-first meal logging")]
#[command(version)]
pub struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/mealpal/config.yaml)
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  /// Keep everything in memory; nothing is written to disk
  #[arg(long)]
  pub ephemeral: bool,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Log a meal
  Add {
    #[arg(short, long)]
    name: String,
    #[arg(short = 't', long = "type", value_enum)]
    meal_type: MealType,
    /// Meal time, e.g. 2026-08-28T12:30 (default: now)
    #[arg(long)]
    time: Option<String>,
    #[arg(short, long)]
    description: Option<String>,
  },
  /// List all meals, most recent first
  List,
  /// Show today's meals
  Today,
  /// Show weekly stats
  Stats,
  /// Change fields of an existing meal
  Update {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long = "type", value_enum)]
    meal_type: Option<MealType>,
    #[arg(long)]
    time: Option<String>,
    #[arg(long)]
    description: Option<String>,
  },
  /// Remove a meal
  Delete { id: String },
  /// Remove every meal
  Clear {
    /// Actually do it
    #[arg(long)]
    yes: bool,
  },
  /// Write a backup file
  Export {
    /// Output path (default: mealpal-backup-<date>.json)
    path: Option<PathBuf>,
  },
  /// Restore from a backup file, replacing all current meals
  Import { path: PathBuf },
  /// Drive the offline cache controller
  #[command(subcommand)]
  Offline(OfflineCommand),
}

#[derive(Subcommand, Debug)]
pub enum OfflineCommand {
  /// Fetch the static asset manifest into the cache and activate
  Install,
  /// Show cache generations
  Status,
  /// Route one request through the controller, cache-first
  Fetch {
    url: String,
    /// Treat it as a full-page navigation
    #[arg(long)]
    navigate: bool,
  },
  /// Deliver a push event payload, as the hosting runtime would
  Push {
    /// JSON payload, e.g. '{"title": "MealPal", "body": "Lunch time"}'
    payload: String,
  },
  /// Deliver a tagged sync event
  Sync {
    #[arg(default_value = crate::offline::BACKGROUND_SYNC_TAG)]
    tag: String,
  },
}

pub async fn run(args: Args) -> Result<()> {
  let config = Config::load(args.config.as_deref())?;

  match args.command {
    Command::Add {
      name,
      meal_type,
      time,
      description,
    } => {
      let mut store = open_store(&config, args.ephemeral)?;
      let record = store.add(crate::store::MealInput {
        name,
        meal_type,
        time: parse_time_or_now(time.as_deref())?,
        description,
      });
      println!("Logged {} ({})", record.name, record.id);
    }

    Command::List => {
      let store = open_store(&config, args.ephemeral)?;
      let meals = store.sorted_for_display();
      if meals.is_empty() {
        println!("No meals logged yet.");
      }
      for meal in meals {
        print_meal(&meal);
      }
    }

    Command::Today => {
      let store = open_store(&config, args.ephemeral)?;
      let meals = store.today_meals();
      println!("{} meal(s) today", meals.len());
      for meal in meals {
        print_meal(&meal);
      }
    }

    Command::Stats => {
      let store = open_store(&config, args.ephemeral)?;
      let stats = store.weekly_stats();
      println!("Last 7 days: {} meal(s)", stats.total_meals);
      println!("Average per day: {}", stats.average_per_day);
    }

    Command::Update {
      id,
      name,
      meal_type,
      time,
      description,
    } => {
      let mut store = open_store(&config, args.ephemeral)?;
      let time = time.as_deref().map(parse_time).transpose()?;
      store.update(
        &id,
        MealPatch {
          name,
          meal_type,
          time,
          description,
        },
      );
      println!("Done.");
    }

    Command::Delete { id } => {
      let mut store = open_store(&config, args.ephemeral)?;
      store.delete(&id);
      println!("Done.");
    }

    Command::Clear { yes } => {
      if !yes {
        return Err(eyre!("This removes every meal. Re-run with --yes to confirm."));
      }
      let mut store = open_store(&config, args.ephemeral)?;
      store.clear();
      println!("All meals removed.");
    }

    Command::Export { path } => {
      let store = open_store(&config, args.ephemeral)?;
      let snapshot = store.export_snapshot();
      let path = path.unwrap_or_else(|| PathBuf::from(default_backup_name(&snapshot.export_date)));
      let json = serde_json::to_vec_pretty(&snapshot)?;
      std::fs::write(&path, json)
        .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;
      println!("Exported {} meal(s) to {}", snapshot.meals.len(), path.display());
    }

    Command::Import { path } => {
      let data =
        std::fs::read(&path).map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
      let mut store = open_store(&config, args.ephemeral)?;
      store.import_snapshot(&data)?;
      println!("Imported {} meal(s).", store.meals().len());
    }

    Command::Offline(offline) => {
      if args.ephemeral {
        run_offline(offline, MemoryCacheStore::new(), &config).await?;
      } else {
        run_offline(offline, SqliteCacheStore::open(&config.cache_db_path()?)?, &config).await?;
      }
    }
  }

  Ok(())
}

/// The CLI plays the hosting runtime here: it drives the controller through
/// install and activation in one go.
async fn run_offline<C: CacheStore>(
  command: OfflineCommand,
  cache: C,
  config: &Config,
) -> Result<()> {
  match command {
    OfflineCommand::Install => {
      let registration = Registration::new();
      let mut controller = OfflineController::new(
        cache,
        HttpFetcher::new(),
        config.generation_names(),
        config.asset_manifest()?,
        registration.clone(),
      );

      controller.install().await?;
      controller.activate()?;

      let snapshot = registration.snapshot();
      println!(
        "Controller active (version {})",
        snapshot.active.as_deref().unwrap_or("?")
      );
    }

    OfflineCommand::Fetch { url, navigate } => {
      let url = Url::parse(&url).map_err(|e| eyre!("Invalid URL {}: {}", url, e))?;
      let request = if navigate {
        FetchRequest::navigate(url)
      } else {
        FetchRequest::get(url)
      };

      let controller = OfflineController::new(
        cache,
        HttpFetcher::new(),
        config.generation_names(),
        config.asset_manifest()?,
        Registration::new(),
      );

      let response = controller.handle_fetch(&request).await?;
      println!(
        "{} {}  {} byte(s)",
        response.status,
        response.content_type.as_deref().unwrap_or("-"),
        response.body.len()
      );
      if let Ok(text) = std::str::from_utf8(&response.body) {
        if !text.is_empty() {
          println!("{text}");
        }
      }
    }

    OfflineCommand::Push { payload } => match crate::offline::handle_push(payload.as_bytes()) {
      Some(notification) => println!("{}: {}", notification.title, notification.body),
      None => println!("No notification shown."),
    },

    OfflineCommand::Sync { tag } => {
      // Nothing is queued offline yet; the deferred task is a no-op.
      crate::offline::handle_sync(&tag, || async { Ok(()) }).await;
      println!("Sync event handled.");
    }

    OfflineCommand::Status => {
      let names = config.generation_names();
      let generations = cache.list_generations()?;
      if generations.is_empty() {
        println!("Cache is empty; run `mealpal offline install` first.");
        return Ok(());
      }
      for generation in generations {
        let marker = if names.is_current(&generation) {
          "current"
        } else {
          "stale, purged on next activation"
        };
        println!("{generation}  [{marker}]");
      }
    }
  }

  Ok(())
}

fn open_store(config: &Config, ephemeral: bool) -> Result<MealStore<Box<dyn PersistedDocumentStore>>> {
  let storage: Box<dyn PersistedDocumentStore> = if ephemeral {
    Box::new(MemoryStore::new())
  } else {
    Box::new(JsonFileStore::at(config.meals_path()?))
  };

  Ok(MealStore::load(storage))
}

fn parse_time(s: &str) -> Result<NaiveDateTime> {
  meal_time::parse(s).map_err(|e| eyre!("Invalid time {:?} (expected YYYY-MM-DDTHH:MM): {}", s, e))
}

fn parse_time_or_now(s: Option<&str>) -> Result<NaiveDateTime> {
  match s {
    Some(s) => parse_time(s),
    None => Ok(
      Local::now()
        .naive_local()
        .with_nanosecond(0)
        .unwrap_or_else(|| Local::now().naive_local()),
    ),
  }
}

fn default_backup_name(export_date: &chrono::DateTime<Utc>) -> String {
  format!("mealpal-backup-{}.json", export_date.format("%Y-%m-%d"))
}

fn print_meal(meal: &MealRecord) {
  let note = meal
    .description
    .as_deref()
    .map(|d| format!("  ({d})"))
    .unwrap_or_default();
  println!(
    "{}  {:<9}  {}  {}{}",
    meal.id,
    meal.meal_type.label(),
    meal.time.format("%Y-%m-%d %H:%M"),
    meal.name,
    note
  );
}
