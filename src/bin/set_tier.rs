use std::{error::Error, path::PathBuf, process::exit};

use clap::Parser;
use rusqlite::Connection;

use pocket_ledger::{
    initialize_db,
    user::{SubscriptionTier, UserID, get_user_by_id, set_user_tier},
};

/// A utility for changing the subscription tier of the registered user.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: PathBuf,

    /// The new tier, "free" or "premium".
    #[arg(long)]
    tier: SubscriptionTier,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    if !args.db_path.is_file() {
        eprintln!("File does not exist at {:#?}!", args.db_path);
        exit(1);
    }

    let connection = Connection::open(&args.db_path)?;
    initialize_db(&connection)?;

    // Only one user can register.
    let user_id = UserID::new(1);
    let user = match get_user_by_id(user_id, &connection) {
        Ok(user) => user,
        Err(error) => {
            eprintln!("Could not load the registered user: {error}");
            exit(1);
        }
    };

    set_user_tier(user.id, args.tier, &connection)?;
    println!("Changed the tier of user {} from {} to {}", user.id, user.tier, args.tier);

    Ok(())
}
