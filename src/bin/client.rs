use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use orderkit::api::MenuItem;
use orderkit::config::ClientArgs;
use orderkit::errors::{Error, Result};
use orderkit::loader::{ImageLoader, RowBindings};
use orderkit::logging;
use orderkit::menu::MenuClient;
use orderkit::order_state::{OrderChange, OrderState};

#[derive(Parser, Debug)]
#[command(name = "client", version, about = "Browse the menu and place orders")]
struct Cli {
    #[command(flatten)]
    client: ClientArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the menu categories
    Categories,
    /// List the items of a category
    Menu { category: String },
    /// Order items by id and print how long they take to prepare
    Order {
        #[arg(required = true)]
        ids: Vec<u32>,
    },
    /// Download the picture of every item of a category
    Images { category: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init("warn");
    let cli = Cli::parse();
    let client = match MenuClient::from_config(&cli.client.into_config()) {
        Ok(client) => client,
        Err(err) => {
            error!("Failed to create client: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Categories => list_categories(&client).await,
        Command::Menu { category } => list_menu(&client, &category).await,
        Command::Order { ids } => place_order(&client, &ids).await,
        Command::Images { category } => download_images(&client, &category).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn list_categories(client: &MenuClient) -> Result<()> {
    for category in client.fetch_categories().await? {
        println!("{}", category);
    }
    Ok(())
}

async fn list_menu(client: &MenuClient, category: &str) -> Result<()> {
    for item in client.fetch_menu_items(category).await? {
        println!("{:>4}  {:<32} ${:>6.2}  {}", item.id, item.name, item.price, item.detail_text);
    }
    Ok(())
}

/// Every item of every category, by id
async fn whole_menu(client: &MenuClient) -> Result<HashMap<u32, MenuItem>> {
    let mut menu = HashMap::new();
    for category in client.fetch_categories().await? {
        for item in client.fetch_menu_items(&category).await? {
            menu.insert(item.id, item);
        }
    }
    Ok(menu)
}

/// Fill the shared order, check out, then reset it like the confirmation screen would
async fn place_order(client: &MenuClient, ids: &[u32]) -> Result<()> {
    let menu = whole_menu(client).await?;
    let order = OrderState::shared();

    let _subscription = order.subscribe(|change, order| match change {
        OrderChange::Appended { index } => println!(
            "+ {} (order total ${:.2})",
            order.menu_items[*index].name,
            order.total()
        ),
        OrderChange::Removed { item, .. } => println!("- {}", item.name),
        OrderChange::Cleared => debug!("order cleared"),
    });

    for id in ids {
        let item = menu
            .get(id)
            .cloned()
            .ok_or_else(|| Error::BadRequest(format!("no menu item with id {}", id)))?;
        order.append(item);
    }

    let preparation_time = client.submit_order(&order.menu_ids()).await?;
    println!("Thank you! Your order will be ready in {}.", preparation_time);
    order.remove_all();
    Ok(())
}

/// Load every picture of a category the way a list view would, one row per item
async fn download_images(client: &MenuClient, category: &str) -> Result<()> {
    let items = client.fetch_menu_items(category).await?;
    let loader = ImageLoader::new(Arc::new(client.clone()))?;
    let bindings = RowBindings::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    for (row, item) in items.iter().enumerate() {
        let url = match item.image_location() {
            Ok(url) => url,
            Err(err) => {
                warn!(item = item.id, "Skipping picture: {}", err);
                continue;
            }
        };
        bindings.bind(row, item.id);
        let tx = tx.clone();
        let name = item.name.clone();
        loader.request_image(row, url, bindings.is_current(row, item.id), move |image| {
            let _ = tx.send((row, name, image));
        });
    }
    // Each load task owns a sender until it ends, so the channel closes once all are done
    drop(tx);

    let mut loaded = 0;
    while let Some((row, name, image)) = rx.recv().await {
        println!(
            "{:>3}  {:<32} {} {}x{} ({} bytes)",
            row,
            name,
            image.format(),
            image.width(),
            image.height(),
            image.data().len()
        );
        loaded += 1;
    }
    println!("{} of {} pictures loaded", loaded, items.len());
    Ok(())
}
