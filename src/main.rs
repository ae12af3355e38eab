use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use color_eyre::Result;
use serde::Serialize;
use std::path::PathBuf;

use eo_archive::config::Config;
use eo_archive::log;
use eo_archive::orders::{
  CachedOrdersClient, ExecutiveOrder, OrderFilters, OrderStats, OrderStatus, OrdersResponse,
  SortBy, SortDirection, DEFAULT_LATEST_LIMIT,
};

#[derive(Parser, Debug)]
#[command(name = "eo")]
#[command(about = "Browse the Executive Orders Archive API from the terminal")]
#[command(version)]
struct Cli {
  /// Path to config file (default: ./eo-archive.yaml or $XDG_CONFIG_HOME/eo-archive/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// API base URL, overrides config and API_BASE_URL
  #[arg(long, global = true)]
  base_url: Option<String>,

  /// Print raw JSON instead of one line per order
  #[arg(long, global = true)]
  json: bool,

  /// Write logs to daily files in this directory
  #[arg(long, global = true)]
  log_file: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List orders matching the given filters
  List {
    #[command(flatten)]
    filters: FilterArgs,

    #[arg(long)]
    page: Option<u32>,

    #[arg(long)]
    page_size: Option<u32>,
  },
  /// Show one order
  Get { id: String },
  /// Show the most recently signed orders
  Latest {
    #[arg(long, default_value_t = DEFAULT_LATEST_LIMIT)]
    limit: u32,
  },
  /// Show orders related to one order
  Related { id: String },
  /// Show aggregate statistics
  Stats,
  /// Walk every page of a filtered list
  Browse {
    #[command(flatten)]
    filters: FilterArgs,

    #[arg(long, default_value_t = 20)]
    page_size: u32,

    /// Stop after this many pages
    #[arg(long)]
    max_pages: Option<u32>,
  },
}

#[derive(Args, Debug)]
struct FilterArgs {
  #[arg(long)]
  president: Option<String>,

  /// active, revoked, superseded or amended
  #[arg(long)]
  status: Option<OrderStatus>,

  /// YYYY-MM-DD
  #[arg(long)]
  start_date: Option<NaiveDate>,

  /// YYYY-MM-DD
  #[arg(long)]
  end_date: Option<NaiveDate>,

  #[arg(long)]
  policy_area: Option<String>,

  #[arg(long)]
  search: Option<String>,

  /// date, number or title
  #[arg(long)]
  sort_by: Option<SortBy>,

  /// asc or desc
  #[arg(long)]
  sort_direction: Option<SortDirection>,
}

impl FilterArgs {
  fn into_filters(self, page: Option<u32>, page_size: Option<u32>) -> OrderFilters {
    OrderFilters {
      president: self.president,
      status: self.status,
      start_date: self.start_date,
      end_date: self.end_date,
      policy_area: self.policy_area,
      search: self.search,
      sort_by: self.sort_by,
      sort_direction: self.sort_direction,
      page,
      page_size,
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let cli = Cli::parse();

  // Load configuration
  let mut config = Config::load(cli.config.as_deref())?;
  if let Some(url) = &cli.base_url {
    config.api.base_url = url.trim_end_matches('/').to_string();
  }

  let _log_guard = log::init(&config.log, cli.log_file.as_deref())?;

  let client = CachedOrdersClient::from_config(&config)?;
  let json = cli.json;

  match cli.command {
    Command::List {
      filters,
      page,
      page_size,
    } => {
      let response = client
        .list_orders(&filters.into_filters(page, page_size))
        .await?;
      print_page(&response, json)?;
    }
    Command::Get { id } => {
      let response = client.get_order(&id).await?;
      if json {
        print_json(&response)?;
      } else {
        print_order_detail(&response.order);
      }
    }
    Command::Latest { limit } => {
      let response = client.latest_orders(limit).await?;
      print_page(&response, json)?;
    }
    Command::Related { id } => {
      let response = client.related_orders(&id).await?;
      print_page(&response, json)?;
    }
    Command::Stats => {
      let stats = client.order_stats().await?;
      if json {
        print_json(&stats)?;
      } else {
        print_stats(&stats);
      }
    }
    Command::Browse {
      filters,
      page_size,
      max_pages,
    } => {
      let mut query = client.infinite_orders(&filters.into_filters(None, None), page_size);
      let mut loaded = 0;

      while max_pages.map_or(true, |max| loaded < max) {
        let Some(page) = query.fetch_next_page().await? else {
          break;
        };
        loaded += 1;

        if json {
          print_json(page)?;
        } else {
          println!("-- page {} of {} ({} orders) --", page.page, page.total_pages, page.total);
          print_orders(&page.orders);
        }
      }
    }
  }

  Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn print_page(response: &OrdersResponse, json: bool) -> Result<()> {
  if json {
    return print_json(response);
  }

  print_orders(&response.orders);
  println!(
    "page {} of {} ({} orders)",
    response.page, response.total_pages, response.total
  );
  Ok(())
}

fn print_orders(orders: &[ExecutiveOrder]) {
  for order in orders {
    println!(
      "EO {}  {}  {}  {}",
      order.number, order.signed_date, order.president_name, order.title
    );
  }
}

fn print_order_detail(order: &ExecutiveOrder) {
  println!("EO {}: {}", order.number, order.title);
  println!("  President:  {}", order.president_name);
  println!("  Signed:     {}", order.signed_date);
  println!("  Status:     {}", order.status);
  if !order.policy_areas.is_empty() {
    println!("  Policy:     {}", order.policy_areas.join(", "));
  }
  if let Some(by) = &order.revoked_by {
    println!("  Revoked by: {}", by);
  }
  if let Some(by) = &order.superseded_by {
    println!("  Superseded: {}", by);
  }
  if !order.amended_by.is_empty() {
    println!("  Amended by: {}", order.amended_by.join(", "));
  }
  if !order.federal_register_url.is_empty() {
    println!("  {}", order.federal_register_url);
  }
  if !order.summary.is_empty() {
    println!();
    println!("{}", order.summary);
  }
}

fn print_stats(stats: &OrderStats) {
  println!("Total orders: {}", stats.total_orders);

  let sections = [
    ("By president", &stats.by_president),
    ("By status", &stats.by_status),
    ("By year", &stats.by_year),
    ("By policy area", &stats.by_policy_area),
  ];
  for (title, counts) in sections {
    if counts.is_empty() {
      continue;
    }
    println!();
    println!("{}:", title);
    for (name, count) in counts {
      println!("  {:<32} {}", name, count);
    }
  }
}
