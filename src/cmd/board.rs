//! Board commands: `scrumboard board|add|edit|move|rm|move-column`.
//!
//! Each invocation builds a fresh engine over the HTTP gateway, warms it
//! up against the server, runs one operation and prints the result.

use anyhow::{Context, Result, bail};
use console::style;

use scrumboard::board::{Board, BoardEngine, ColumnId, HttpGateway, Mutation};
use scrumboard::config::Config;

/// Number of id characters shown in listings. Any unique prefix is
/// accepted wherever a card id is expected.
const SHORT_ID_LEN: usize = 8;

async fn connect(config: &Config) -> Result<BoardEngine<HttpGateway>> {
    let gateway = HttpGateway::new(config.api_url(), config.timeout())
        .context("Failed to create HTTP client")?;
    let engine = BoardEngine::new(gateway);
    engine
        .warm_up()
        .await
        .with_context(|| format!("Could not load the board from {}", config.api_url()))?;
    Ok(engine)
}

fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Resolve a full id or a unique id prefix against the board.
pub fn resolve_card_id(board: &Board, input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        bail!("Card id must not be empty");
    }
    if board.card(input).is_some() {
        return Ok(input.to_string());
    }
    let matches: Vec<String> = board
        .card_ids()
        .into_iter()
        .filter(|id| id.starts_with(input))
        .collect();
    match matches.as_slice() {
        [] => bail!("No card matches '{}'", input),
        [id] => Ok(id.clone()),
        _ => bail!(
            "Card id '{}' is ambiguous ({} matches); use more characters",
            input,
            matches.len()
        ),
    }
}

fn ensure_applied(outcome: Mutation, card_id: &str) -> Result<()> {
    match outcome {
        Mutation::Applied => Ok(()),
        Mutation::NotFound => bail!("Card {} is no longer on the board", short_id(card_id)),
    }
}

/// Render the board as plain text, one section per column in display
/// order.
pub fn render_board(board: &Board) -> String {
    let mut out = String::new();
    for column in &board.columns {
        out.push_str(&format!(
            "{} {}\n",
            style(&column.title).bold().cyan(),
            style(format!("({})", column.cards.len())).dim()
        ));
        if column.cards.is_empty() {
            out.push_str(&format!("  {}\n", style("(empty)").dim()));
        }
        for card in &column.cards {
            out.push_str(&format!(
                "  {} {}\n",
                style(short_id(&card.id)).yellow(),
                card.title
            ));
            if !card.description.trim().is_empty() {
                for line in card.description.lines() {
                    out.push_str(&format!("      {}\n", style(line).dim()));
                }
            }
        }
        out.push('\n');
    }
    out
}

pub async fn cmd_board(config: &Config) -> Result<()> {
    let engine = connect(config).await?;
    let board = engine.board();
    print!("{}", render_board(&board));
    println!(
        "{}",
        style(format!("{} card(s) from {}", board.card_count(), config.api_url())).dim()
    );
    Ok(())
}

pub async fn cmd_add(
    config: &Config,
    column: ColumnId,
    title: &str,
    description: Option<&str>,
) -> Result<()> {
    let engine = connect(config).await?;
    let record = engine.create_card(column, title).await?;

    if let Some(description) = description {
        let outcome = engine.update_description(&record.id, description).await?;
        ensure_applied(outcome, &record.id)?;
    }

    println!(
        "{} {} to {}",
        style("Added").green().bold(),
        style(short_id(&record.id)).yellow(),
        column.title()
    );
    Ok(())
}

pub async fn cmd_edit(
    config: &Config,
    id: &str,
    title: Option<&str>,
    description: Option<&str>,
) -> Result<()> {
    if title.is_none() && description.is_none() {
        bail!("Nothing to change: pass --title and/or --description");
    }
    let engine = connect(config).await?;
    let card_id = resolve_card_id(&engine.board(), id)?;

    if let Some(title) = title {
        ensure_applied(engine.update_title(&card_id, title).await?, &card_id)?;
    }
    if let Some(description) = description {
        ensure_applied(
            engine.update_description(&card_id, description).await?,
            &card_id,
        )?;
    }

    println!(
        "{} {}",
        style("Updated").green().bold(),
        style(short_id(&card_id)).yellow()
    );
    Ok(())
}

pub async fn cmd_move(
    config: &Config,
    id: &str,
    to: ColumnId,
    position: Option<usize>,
) -> Result<()> {
    let engine = connect(config).await?;
    let board = engine.board();
    let card_id = resolve_card_id(&board, id)?;
    let Some((from, _)) = board.locate(&card_id) else {
        bail!("Card {} is no longer on the board", short_id(&card_id));
    };

    let outcome = engine.move_card(&card_id, from, to, position).await?;
    ensure_applied(outcome, &card_id)?;

    let placed_at = engine
        .board()
        .locate(&card_id)
        .map(|(_, index)| index)
        .unwrap_or_default();
    println!(
        "{} {} from {} to {} (position {})",
        style("Moved").green().bold(),
        style(short_id(&card_id)).yellow(),
        from.title(),
        to.title(),
        placed_at
    );
    Ok(())
}

pub async fn cmd_rm(config: &Config, id: &str) -> Result<()> {
    let engine = connect(config).await?;
    let card_id = resolve_card_id(&engine.board(), id)?;
    let outcome = engine.delete_card(&card_id).await?;
    ensure_applied(outcome, &card_id)?;

    println!(
        "{} {}",
        style("Deleted").green().bold(),
        style(short_id(&card_id)).yellow()
    );
    Ok(())
}

pub async fn cmd_move_column(config: &Config, column: ColumnId, position: usize) -> Result<()> {
    let engine = connect(config).await?;
    let Some(from) = engine
        .board()
        .columns
        .iter()
        .position(|c| c.id == column)
    else {
        bail!("Column {} is not on the board", column);
    };

    let outcome = engine.move_column(from, position).await?;
    if outcome == Mutation::NotFound {
        bail!("Column {} is not on the board", column);
    }

    let order: Vec<&str> = engine
        .board()
        .columns
        .iter()
        .map(|c| c.id.title())
        .collect();
    println!(
        "{} {}",
        style("Column order:").green().bold(),
        order.join(" | ")
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrumboard::board::Card;

    fn board_with(cards: &[(&str, ColumnId)]) -> Board {
        let mut board = Board::default();
        for (id, column) in cards {
            board.column_mut(*column).unwrap().cards.push(Card {
                id: id.to_string(),
                title: format!("Title {}", id),
                description: String::new(),
                row: 0,
            });
        }
        board
    }

    #[test]
    fn resolve_exact_id() {
        let board = board_with(&[("abc", ColumnId::Todo), ("abcdef", ColumnId::Done)]);
        assert_eq!(resolve_card_id(&board, "abc").unwrap(), "abc");
    }

    #[test]
    fn resolve_unique_prefix() {
        let board = board_with(&[("1234-aaaa", ColumnId::Todo), ("5678-bbbb", ColumnId::Done)]);
        assert_eq!(resolve_card_id(&board, "56").unwrap(), "5678-bbbb");
    }

    #[test]
    fn resolve_rejects_ambiguous_and_unknown() {
        let board = board_with(&[("ab-1", ColumnId::Todo), ("ab-2", ColumnId::Done)]);
        let err = resolve_card_id(&board, "ab").unwrap_err();
        assert!(err.to_string().contains("ambiguous"));
        let err = resolve_card_id(&board, "zz").unwrap_err();
        assert!(err.to_string().contains("No card matches"));
        assert!(resolve_card_id(&board, "  ").is_err());
    }

    #[test]
    fn short_id_truncates_long_ids() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn render_lists_columns_in_display_order() {
        let mut board = board_with(&[("card-1", ColumnId::InProgress)]);
        board.columns.reverse();
        let text = console::strip_ansi_codes(&render_board(&board)).to_string();
        let done = text.find("Done").unwrap();
        let backlog = text.find("Backlog").unwrap();
        assert!(done < backlog);
        assert!(text.contains("card-1 Title card-1"));
        assert!(text.contains("In Progress (1)"));
        assert!(text.contains("(empty)"));
    }
}
