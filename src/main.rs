use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use engine::tt::TT;
use engine::{ChessPosition, Engine, EvalWeights, Evaluator, MoveGuard, Position, SearchConfig, START_FEN};

#[derive(Parser, Debug)]
#[command(name = "chess-search", author, version, about = "Alpha-beta chess move search", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search a single position and print the best move
    Analyse {
        #[arg(long, default_value = START_FEN)]
        fen: String,

        #[command(flatten)]
        search: SearchArgs,

        /// Also list every legal move with its one-ply static score
        #[arg(long)]
        list_moves: bool,
    },
    /// Print the evaluation terms of a position
    Eval {
        #[arg(long, default_value = START_FEN)]
        fen: String,
    },
    /// Let the engine play both sides
    Selfplay {
        #[arg(long, default_value = START_FEN)]
        fen: String,

        #[command(flatten)]
        search: SearchArgs,

        /// Stop after this many plies
        #[arg(long, default_value_t = 200)]
        max_moves: usize,
    },
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Target depth in plies
    #[arg(short, long, default_value_t = engine::types::DEFAULT_DEPTH)]
    depth: u32,

    /// Time budget per move in milliseconds
    #[arg(short = 't', long)]
    movetime: Option<u64>,

    /// Transposition table size in megabytes
    #[arg(long, env = "TT_MB", default_value_t = 64)]
    hash: usize,

    /// Node budget per move
    #[arg(long)]
    nodes: Option<u64>,

    /// Disable aspiration windows
    #[arg(long)]
    no_aspiration: bool,
}

impl SearchArgs {
    fn to_config(&self) -> Result<SearchConfig> {
        let mut config = SearchConfig::with_depth(self.depth).tt_capacity(TT::entries_for_mb(self.hash));
        if let Some(ms) = self.movetime {
            config = config.time_budget(Duration::from_millis(ms));
        }
        if let Some(n) = self.nodes {
            config = config.node_limit(n);
        }
        if self.no_aspiration {
            config = config.aspiration_window(None);
        }
        config.validate().context("invalid search options")?;
        Ok(config)
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, log_level))
        .format(|buf, record| writeln!(buf, "[{}] {}: {}", record.level(), record.target(), record.args()))
        .write_style(env_logger::WriteStyle::Never)
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run(cli.command) {
        log::error!("{e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Analyse { fen, search, list_moves } => analyse(&fen, &search, list_moves),
        Command::Eval { fen } => eval(&fen),
        Command::Selfplay { fen, search, max_moves } => selfplay(&fen, &search, max_moves),
    }
}

fn load(fen: &str) -> Result<ChessPosition> {
    ChessPosition::from_fen(fen).with_context(|| format!("cannot load position `{fen}`"))
}

fn analyse(fen: &str, args: &SearchArgs, list_moves: bool) -> Result<()> {
    let mut pos = load(fen)?;
    let config = args.to_config()?;

    if list_moves {
        let evaluator = Evaluator::new(config.eval);
        let mut scored: Vec<_> = pos
            .legal_moves()
            .into_iter()
            .map(|m| {
                let child = MoveGuard::new(&mut pos, m);
                // Score for the side that just moved.
                let score = if child.is_checkmate() { engine::MATE } else { -evaluator.evaluate_relative(child.board()) };
                (m, score)
            })
            .collect();
        scored.sort_by_key(|&(_, s)| std::cmp::Reverse(s));
        println!("move   | static");
        for (m, s) in &scored {
            println!("{:<6} | {:>6}", m.to_string(), s);
        }
        println!();
    }

    let mut engine = Engine::new(config)?;
    let r = engine.choose_move(&mut pos).context("search failed")?;
    println!("bestmove {}", r.best_move);
    match r.mate_in() {
        Some(n) => println!("score mate {n}"),
        None => println!("score cp {}", r.score),
    }
    println!(
        "depth {} seldepth {} nodes {} time {}ms complete {}",
        r.depth_reached,
        r.seldepth,
        r.nodes,
        r.elapsed.as_millis(),
        r.complete
    );
    println!("pv {}", r.pv_string());
    Ok(())
}

fn eval(fen: &str) -> Result<()> {
    let pos = load(fen)?;
    let evaluator = Evaluator::new(EvalWeights::default());
    let b = evaluator.breakdown(pos.board());
    println!("material       {:>6}", b.material);
    println!("piece-square   {:>6}", b.piece_square);
    println!("pawn structure {:>6}", b.pawn_structure);
    println!("king safety    {:>6}", b.king_safety);
    println!("mobility       {:>6}", b.mobility);
    println!("center         {:>6}", b.center);
    println!("coordination   {:>6}", b.coordination);
    println!("king tropism   {:>6}", b.king_tropism);
    println!("trapped pieces {:>6}", b.trapped);
    println!("tempo          {:>6}", b.tempo);
    println!("total (white)  {:>6}", evaluator.evaluate(pos.board()));
    Ok(())
}

fn selfplay(fen: &str, args: &SearchArgs, max_moves: usize) -> Result<()> {
    let mut pos = load(fen)?;
    let mut engine = Engine::new(args.to_config()?)?;
    let mut played = Vec::new();

    let outcome = loop {
        if pos.is_checkmate() {
            break format!("{:?} is checkmated", pos.side_to_move());
        }
        if pos.is_stalemate() {
            break "stalemate".to_string();
        }
        if pos.is_draw() {
            break "draw".to_string();
        }
        if played.len() >= max_moves {
            break format!("stopped after {max_moves} plies");
        }

        let r = engine.choose_move(&mut pos).context("search failed")?;
        info!("ply {} {} score {} depth {}", played.len() + 1, r.best_move, r.score, r.depth_reached);
        pos.make_move(r.best_move);
        played.push(r.best_move);
    };

    let moves: Vec<String> = played.iter().map(|m| m.to_string()).collect();
    println!("{}", moves.join(" "));
    println!("result: {outcome}");
    println!("final: {}", pos.to_fen());
    Ok(())
}
