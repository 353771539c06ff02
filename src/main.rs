//! BasePulse CLI
//!
//! Terminal dashboards over the BasePulse data layer:
//! - Browse polls, fundings, distributions, voters and claims
//! - Platform statistics and ETH price
//! - Switch between subgraph and contract reads
//! - Points, quests, leaderboard, gas and swap quotes from the backend

use anyhow::{bail, Context};
use basepulse::backend::{FeedbackRequest, SideShiftQuoteRequest};
use basepulse::config::generate_default_config;
use basepulse::contract::Erc20;
use basepulse::models::{format_units, wei_to_eth};
use basepulse::{
    AppContext, Config, DataSource, PageRequest, Poll, PollFilter, QueryResult,
};
use alloy_primitives::Address;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "basepulse")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "PulsePoll data from the BasePulse subgraph or contract")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.config/basepulse/config.toml, ./config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the active chain id
    #[arg(long, global = true)]
    chain_id: Option<u64>,

    /// Use an in-memory store; nothing is persisted
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List polls, newest first
    Polls {
        /// Only active polls
        #[arg(long)]
        active: bool,
        /// Only polls created by this address (subgraph only)
        #[arg(long)]
        creator: Option<Address>,
        /// Page size (default: subgraph.page_size)
        #[arg(long)]
        first: Option<usize>,
        /// Number of pages to load
        #[arg(long, default_value = "1")]
        pages: usize,
    },

    /// Show one poll
    Poll { id: u64 },

    /// Funding history of a poll
    Fundings {
        id: u64,
        #[arg(long, default_value = "20")]
        first: usize,
    },

    /// Reward distributions of a poll
    Distributions {
        id: u64,
        #[arg(long, default_value = "20")]
        first: usize,
    },

    /// Unique voters of a poll
    Voters {
        id: u64,
        #[arg(long, default_value = "100")]
        first: usize,
    },

    /// Claim history of an address
    Claims {
        address: Address,
        #[arg(long, default_value = "20")]
        first: usize,
    },

    /// Platform statistics and ETH price
    Stats,

    /// Daily activity buckets
    DailyStats {
        #[arg(long, default_value = "7")]
        days: usize,
    },

    /// Show or change the data source
    Source {
        #[command(subcommand)]
        action: Option<SourceAction>,
    },

    /// Current ETH/USD price
    Price,

    /// Voted polls of an address
    Voted {
        address: Address,
        /// Check a single poll
        #[arg(long)]
        poll: Option<u64>,
        /// Reload the voted set from the subgraph
        #[arg(long)]
        refresh: bool,
    },

    /// Whether an address owns the polls contract
    Owner { address: Address },

    /// ERC-20 balance of an account
    Balance { token: Address, account: Address },

    /// Points, XP and level of an address
    Points { address: Address },

    /// Quests of an address
    Quests {
        address: Address,
        /// Claim a completed quest
        #[arg(long)]
        claim: Option<String>,
    },

    /// Top participants
    Leaderboard {
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Current gas price on Base
    Gas,

    /// Supported SideShift pairs
    Pairs,

    /// Request a SideShift quote
    Quote {
        deposit_coin: String,
        settle_coin: String,
        amount: String,
        settle_address: String,
    },

    /// Send feedback
    Feedback {
        message: String,
        #[arg(long, default_value = "general")]
        category: String,
        /// 1-5
        #[arg(long)]
        rating: Option<u8>,
        #[arg(long)]
        address: Option<Address>,
    },

    /// Show or change the sidebar flag
    Sidebar {
        #[command(subcommand)]
        action: Option<SidebarAction>,
    },

    /// Check or dismiss an announcement
    Announcement {
        id: String,
        #[arg(long)]
        dismiss: bool,
    },

    /// Local cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SourceAction {
    /// Print the current source
    Show,
    /// Persist a source
    Set { source: DataSource },
    /// Flip between subgraph and contract
    Toggle,
}

#[derive(Subcommand)]
enum SidebarAction {
    Show,
    Toggle,
    Collapse,
    Expand,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Drop voted-polls entries and the data source preference
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Wrote default config to {}", path.display());
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(chain_id) = cli.chain_id {
        config.network.chain_id = chain_id;
    }
    if let Commands::Polls {
        first: Some(first), ..
    } = &cli.command
    {
        config.subgraph.page_size = *first;
    }

    init_logging(&config);

    let mut ctx = if cli.ephemeral {
        AppContext::ephemeral(config)?
    } else {
        AppContext::new(config)?
    };

    let result = run(&ctx, cli.command, cli.format).await;
    ctx.shutdown();
    result
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("basepulse={}", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(ctx: &AppContext, command: Commands, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        Commands::Polls {
            active,
            creator,
            pages,
            ..
        } => {
            let filter = PollFilter {
                is_active: active.then_some(true),
                creator,
            };
            let feed = ctx.poll_feed(filter);
            feed.load_first().await;
            for _ in 1..pages {
                if feed.state().error.is_some() || feed.load_more().await.is_none() {
                    break;
                }
            }

            let state = feed.state();
            if let Some(error) = &state.error {
                bail!("{}", error);
            }
            emit(format, &state.polls, |polls| {
                print_polls(polls);
                if state.has_more {
                    println!("(more available: --pages {})", pages + 1);
                }
            })?;
        }

        Commands::Poll { id } => {
            let poll = settle(ctx.router.fetch_poll(id).await)?;
            let Some(poll) = poll else {
                bail!("Poll {} not found", id);
            };
            emit(format, &poll, print_poll)?;
        }

        Commands::Fundings { id, first } => {
            let fundings = settle(
                ctx.router
                    .fetch_poll_fundings(id, PageRequest::new(first, 0))
                    .await,
            )?;
            emit(format, &fundings, |fundings| {
                println!("{:<44} {:>14} {}", "FUNDER", "AMOUNT (ETH)", "TIME");
                for f in fundings {
                    println!(
                        "{:<44} {:>14.6} {}",
                        f.funder,
                        wei_to_eth(f.amount),
                        f.timestamp.format("%Y-%m-%d %H:%M")
                    );
                }
            })?;
        }

        Commands::Distributions { id, first } => {
            let distributions = settle(
                ctx.router
                    .fetch_poll_distributions(id, PageRequest::new(first, 0))
                    .await,
            )?;
            emit(format, &distributions, |items| {
                println!("{:<44} {:>14} {:<12} {}", "RECIPIENT", "AMOUNT (ETH)", "TYPE", "TIME");
                for d in items {
                    println!(
                        "{:<44} {:>14.6} {:<12} {}",
                        d.recipient,
                        wei_to_eth(d.amount),
                        d.event_type,
                        d.timestamp.format("%Y-%m-%d %H:%M")
                    );
                }
            })?;
        }

        Commands::Voters { id, first } => {
            let votes = settle(
                ctx.router
                    .fetch_poll_voters(id, PageRequest::new(first, 0))
                    .await,
            )?;
            emit(format, &votes, |votes| {
                println!("{:<44} {:>6} {}", "VOTER", "OPTION", "TIME");
                for v in votes {
                    println!(
                        "{:<44} {:>6} {}",
                        v.voter,
                        v.option_index,
                        v.timestamp.format("%Y-%m-%d %H:%M")
                    );
                }
                println!("{} unique voters", votes.len());
            })?;
        }

        Commands::Claims { address, first } => {
            let claims = settle(
                ctx.router
                    .fetch_claim_history(address, PageRequest::new(first, 0))
                    .await,
            )?;
            emit(format, &claims, |claims| {
                println!("{:>6} {:>14} {}", "POLL", "AMOUNT (ETH)", "TIME");
                for c in claims {
                    println!(
                        "{:>6} {:>14.6} {}",
                        c.poll_id,
                        wei_to_eth(c.amount),
                        c.timestamp.format("%Y-%m-%d %H:%M")
                    );
                }
            })?;
        }

        Commands::Stats => {
            let (stats, price) =
                futures_util::join!(ctx.router.fetch_global_stats(), ctx.price.eth_usd());
            let served_by = stats.served_by;
            let stats = settle(stats)?;

            emit(format, &stats, |s| {
                let funding_eth = wei_to_eth(s.total_funding);
                println!("Total polls:       {}", s.total_polls);
                println!("Total votes:       {}", s.total_votes);
                println!(
                    "Total funding:     {:.4} ETH (${:.2})",
                    funding_eth,
                    funding_eth * price.price_usd
                );
                println!("Total distributed: {:.4} ETH", wei_to_eth(s.total_distributed));
                println!("Unique voters:     {}", s.unique_voters);
                println!("Unique funders:    {}", s.unique_funders);
                if let Some(served_by) = served_by {
                    println!("(served by {})", served_by);
                }
            })?;
        }

        Commands::DailyStats { days } => {
            let buckets = settle(ctx.router.fetch_daily_stats(days).await)?;
            emit(format, &buckets, |buckets| {
                println!("{:<12} {:>6} {:>6} {:>14}", "DAY", "POLLS", "VOTES", "FUNDING (ETH)");
                for b in buckets {
                    println!(
                        "{:<12} {:>6} {:>6} {:>14.6}",
                        b.day_start.format("%Y-%m-%d"),
                        b.polls_created,
                        b.votes_cast,
                        wei_to_eth(b.funding_amount)
                    );
                }
            })?;
        }

        Commands::Source { action } => {
            let source = match action.unwrap_or(SourceAction::Show) {
                SourceAction::Show => ctx.preference.get(),
                SourceAction::Set { source } => {
                    ctx.preference.set(source)?;
                    source
                }
                SourceAction::Toggle => ctx.preference.toggle()?,
            };
            emit(format, &source, |s| println!("Data source: {}", s))?;
        }

        Commands::Price => {
            let quote = ctx.price.eth_usd().await;
            emit(format, &quote.price_usd, |price| {
                println!("ETH/USD: ${:.2} ({:?})", price, quote.source);
            })?;
        }

        Commands::Voted {
            address,
            poll,
            refresh,
        } => {
            if refresh {
                ctx.votes.refresh(address).await?;
            }
            match poll {
                Some(poll_id) => {
                    let voted = ctx.votes.has_voted(poll_id, address).await?;
                    emit(format, &voted, |voted| {
                        println!(
                            "{} {} voted on poll {}",
                            address,
                            if *voted { "has" } else { "has not" },
                            poll_id
                        );
                    })?;
                }
                None => {
                    let entry = ctx.votes.cached(address);
                    emit(format, &entry, |entry| match entry {
                        Some(e) => {
                            println!("Voted polls: {:?}", e.poll_ids);
                            println!(
                                "{} total, {}",
                                e.total_count,
                                if e.is_valid() { "fresh" } else { "stale" }
                            );
                        }
                        None => println!("Nothing cached; use --refresh"),
                    })?;
                }
            }
        }

        Commands::Owner { address } => {
            let is_owner = settle(ctx.router.is_owner(address).await)?;
            emit(format, &is_owner, |owner| {
                println!("{} {} the contract owner", address, if *owner { "is" } else { "is not" });
            })?;
        }

        Commands::Balance { token, account } => {
            let Some(contract) = &ctx.contract else {
                bail!("No polls contract configured for chain {}", ctx.chain_id());
            };
            let erc20 = Erc20::new(contract.provider().clone(), token);
            let (balance, decimals, symbol) =
                futures_util::join!(erc20.balance_of(account), erc20.decimals(), erc20.symbol());
            let amount = format_units(balance?, decimals?);
            let symbol = symbol?;
            emit(format, &amount, |amount| println!("{} {}", amount, symbol))?;
        }

        Commands::Points { address } => {
            let points = ctx.backend.participant_points(&address.to_string()).await?;
            emit(format, &points, |p| {
                println!("Points: {}", p.points);
                println!("Level:  {} ({} XP)", p.level, p.xp);
                if let Some(next) = p.xp_to_next_level {
                    println!("Next:   {} XP to go", next);
                }
                println!("Streak: {} days", p.streak_days);
            })?;
        }

        Commands::Quests { address, claim } => {
            let address = address.to_string();
            if let Some(quest_id) = claim {
                let claimed = ctx.backend.claim_quest(&address, &quest_id).await?;
                emit(format, &claimed, |c| {
                    println!("Claimed {}: +{} XP, +{} points", c.quest_id, c.xp_awarded, c.points_awarded);
                })?;
                return Ok(());
            }

            let quests = ctx.backend.participant_quests(&address).await?;
            emit(format, &quests, |quests| {
                for q in quests {
                    let mark = if q.claimed {
                        "claimed"
                    } else if q.is_claimable() {
                        "claimable"
                    } else {
                        ""
                    };
                    println!(
                        "{:<16} {:<32} {:>5.0}% {:>5} XP {}",
                        q.id,
                        q.title,
                        q.completion() * 100.0,
                        q.xp_reward,
                        mark
                    );
                }
            })?;
        }

        Commands::Leaderboard { limit } => {
            let entries = ctx.backend.leaderboard(limit).await?;
            emit(format, &entries, |entries| {
                println!("{:>4} {:<44} {:>8} {:>8}", "#", "ADDRESS", "POINTS", "XP");
                for e in entries {
                    println!("{:>4} {:<44} {:>8} {:>8}", e.rank, e.address, e.points, e.xp);
                }
            })?;
        }

        Commands::Gas => {
            let gas = ctx.backend.gas_price().await?;
            emit(format, &gas, |g| {
                println!("Base fee:     {:.4} gwei", g.base_fee_gwei);
                println!("Priority fee: {:.4} gwei", g.priority_fee_gwei);
                if let Some(cost) = g.estimated_vote_cost_eth {
                    println!("Vote cost:    ~{:.6} ETH", cost);
                }
            })?;
        }

        Commands::Pairs => {
            let pairs = ctx.backend.sideshift_pairs().await?;
            emit(format, &pairs, |pairs| {
                for p in pairs {
                    println!(
                        "{:>8} -> {:<8} rate {} (min {}, max {})",
                        p.deposit_coin, p.settle_coin, p.rate, p.min, p.max
                    );
                }
            })?;
        }

        Commands::Quote {
            deposit_coin,
            settle_coin,
            amount,
            settle_address,
        } => {
            let request = SideShiftQuoteRequest {
                deposit_coin,
                settle_coin,
                deposit_amount: amount,
                settle_address,
            };
            let quote = ctx.backend.sideshift_quote(&request).await?;
            emit(format, &quote, |q| {
                println!("Quote {}", q.id);
                println!("Send {} receive {} (rate {})", q.deposit_amount, q.settle_amount, q.rate);
                println!("Expires {}", q.expires_at);
            })?;
        }

        Commands::Feedback {
            message,
            category,
            rating,
            address,
        } => {
            let receipt = ctx
                .backend
                .submit_feedback(&FeedbackRequest {
                    address: address.map(|a| a.to_string()),
                    category,
                    message,
                    rating,
                })
                .await?;
            emit(format, &receipt.id, |id| println!("Feedback sent ({})", id))?;
        }

        Commands::Sidebar { action } => {
            let collapsed = match action.unwrap_or(SidebarAction::Show) {
                SidebarAction::Show => ctx.ui.sidebar_collapsed()?,
                SidebarAction::Toggle => ctx.ui.toggle_sidebar()?,
                SidebarAction::Collapse => {
                    ctx.ui.set_sidebar_collapsed(true)?;
                    true
                }
                SidebarAction::Expand => {
                    ctx.ui.set_sidebar_collapsed(false)?;
                    false
                }
            };
            emit(format, &collapsed, |c| {
                println!("Sidebar {}", if *c { "collapsed" } else { "expanded" });
            })?;
        }

        Commands::Announcement { id, dismiss } => {
            if dismiss {
                ctx.ui.dismiss_announcement(&id)?;
            }
            let dismissed = ctx.ui.is_announcement_dismissed(&id)?;
            emit(format, &dismissed, |d| {
                println!("Announcement {} {}", id, if *d { "dismissed" } else { "visible" });
            })?;
        }

        Commands::Cache {
            action: CacheAction::Clear,
        } => {
            let report = ctx.clear_local_caches()?;
            println!(
                "Cleared {} voted-polls entries{}",
                report.voted_poll_entries,
                if report.data_source_cleared {
                    " and the data source preference"
                } else {
                    ""
                }
            );
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Unwrap a routed result, turning its error into a CLI failure
fn settle<T>(result: QueryResult<T>) -> anyhow::Result<T> {
    match result.error {
        Some(error) => bail!("{}", error),
        None => Ok(result.data),
    }
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, table: impl FnOnce(&T)) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => table(value),
    }
    Ok(())
}

fn print_polls(polls: &[Poll]) {
    if polls.is_empty() {
        println!("No polls found");
        return;
    }

    println!("{:>6} {:<48} {:>6} {:>12} {}", "ID", "QUESTION", "VOTES", "FUNDING", "STATUS");
    let now = chrono::Utc::now();
    for p in polls {
        let question: String = p.question.chars().take(48).collect();
        println!(
            "{:>6} {:<48} {:>6} {:>12.4} {}",
            p.id,
            question,
            p.participant_count,
            wei_to_eth(p.total_funding),
            if p.is_open(now) { "open" } else { "closed" }
        );
    }
}

fn print_poll(p: &Poll) {
    println!("Poll #{}: {}", p.id, p.question);
    for (i, option) in p.options.iter().enumerate() {
        println!("  [{}] {}", i, option);
    }
    println!("Creator:  {}", p.creator);
    println!("Votes:    {}", p.participant_count);
    println!("Funding:  {:.6}", wei_to_eth(p.total_funding));
    if let Some(token) = p.funding_token {
        println!("Token:    {}", token);
    }
    println!("Ends:     {}", p.end_time.format("%Y-%m-%d %H:%M UTC"));
    println!(
        "Status:   {}",
        if p.is_open(chrono::Utc::now()) { "open" } else { "closed" }
    );
}
