use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::Rng;

use no_guess_mines::Generator;

/// Generates a Minesweeper board solvable without guessing from a given
/// start cell, and prints the mine positions.
#[derive(Parser)]
#[clap(about, long_about = None)]
struct Cli {
    /// Board height, in rows.
    height: usize,
    /// Board width, in columns.
    width: usize,
    /// Number of mines.
    mines: i32,
    /// Row of the first click (0-indexed).
    start_row: usize,
    /// Column of the first click (0-indexed).
    start_col: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let hw = cli.height as i64 * cli.width as i64;
    if cli.height == 0
        || cli.width == 0
        || hw > 50 * 50
        || cli.start_row >= cli.height
        || cli.start_col >= cli.width
        || cli.mines < 0
        || cli.mines as i64 >= hw - 9
    {
        bail!(
            "invalid parameters: height={} width={} mines={} start_row={} start_col={}",
            cli.height,
            cli.width,
            cli.mines,
            cli.start_row,
            cli.start_col
        );
    }

    let seed = rand::thread_rng().gen();
    let mut generator = Generator::new(
        cli.height,
        cli.width,
        cli.start_row,
        cli.start_col,
        cli.mines,
        seed,
    );

    let found = generator
        .generate()
        .context("generator hit an internal invariant violation")?;

    if !found {
        std::process::exit(1);
    }

    for (row, col) in generator.mine_positions() {
        println!("{row},{col}");
    }

    Ok(())
}
