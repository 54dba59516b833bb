//! search-box - a debounced search box built with hookline.
//!
//! This demo simulates a user typing into a search field and shows:
//! - use_debounce_value to wait for typing to settle
//! - use_async so only the newest search updates the results
//! - use_undo_redo_state to step through previous queries

use hookline::prelude::*;
use std::time::Duration;

const CATALOG: &[&str] = &[
    "rust-analyzer",
    "rustfmt",
    "tokio",
    "tracing",
    "thiserror",
    "futures",
    "hookline",
];

const DEBOUNCE: Duration = Duration::from_millis(300);

/// Everything one render of the search box hands back to the event loop.
struct SearchBox {
    query: String,
    search: AsyncOperation<String, Vec<&'static str>>,
    history: UndoRedoHandle<String>,
}

async fn search_catalog(query: String) -> Result<Vec<&'static str>, String> {
    tokio::time::sleep(Duration::from_millis(80)).await;
    if query.trim().is_empty() {
        return Err(String::from("empty query"));
    }
    Ok(CATALOG
        .iter()
        .copied()
        .filter(|name| name.contains(query.as_str()))
        .collect())
}

fn search_box(input: &str) -> SearchBox {
    let query = use_debounce_value(input.to_string(), DEBOUNCE);
    let search = use_async(
        search_catalog,
        AsyncOptions::new()
            .on_success(|hits: &Vec<&'static str>| {
                tracing::info!(count = hits.len(), "search finished")
            })
            .on_error(|error| tracing::warn!(%error, "search failed")),
    );
    let history = use_undo_redo_state(String::new);

    SearchBox {
        query,
        search,
        history,
    }
}

fn main() -> Result<(), RuntimeError> {
    let runtime = Runtime::new()?;
    let component = runtime.component();

    let mut input = String::new();
    let mut searched = String::new();

    for word in ["tok", "tr", "rust"] {
        input.clear();
        for ch in word.chars() {
            input.push(ch);
            component.render(|| search_box(&input));
            tracing::debug!(input = %input, "keystroke");
            runtime.sleep(Duration::from_millis(120));
        }

        // Let the debounce settle.
        runtime.sleep(DEBOUNCE * 2);

        let view = component.render(|| search_box(&input));
        if view.query != searched {
            searched = view.query.clone();
            view.history.set(view.query.clone());
            let task = runtime.spawn(view.search.execute(view.query.clone()));
            match runtime.block_on(task) {
                Ok(Ok(Some(hits))) => println!("{:>6} -> {hits:?}", view.query),
                Ok(Ok(None)) => println!("{:>6} -> superseded", view.query),
                Ok(Err(error)) => println!("{:>6} -> error: {error}", view.query),
                Err(error) => tracing::error!(%error, "search task failed"),
            }
        }
    }

    let view = component.render(|| search_box(&input));
    while view.history.undo() {
        println!("undo  -> {:?}", view.history.get());
    }
    while view.history.redo() {
        println!("redo  -> {:?}", view.history.get());
    }

    component.unmount();
    tracing::info!("search box unmounted");
    Ok(())
}
