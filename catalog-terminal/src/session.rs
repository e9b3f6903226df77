//! Line-oriented interactive session over a [`CatalogPage`].

use catalog_flow::CatalogPage;
use std::io::{self, Write};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::render;

/// How long the modal overlay takes to fade out.
const CLOSE_TRANSITION: Duration = Duration::from_millis(150);

const HELP: &str = "\
Commands:
  sort                 flip the score sort direction
  select <id>          select a movie (again to deselect)
  clear                drop the selection
  score <digits>       type into the score field
  comment <text>       type into the comment field
  submit               post the review
  close                close the modal review form
  reload               fetch the catalog again
  narrow on|off        switch between the modal and inline form
  help                 show this list
  quit                 leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Sort,
    Select(String),
    Clear,
    Score(String),
    Comment(String),
    Submit,
    Close,
    Reload,
    Narrow(bool),
    Help,
    Quit,
}

pub fn parse_action(line: &str) -> Result<Action, String> {
    let line = line.trim();
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    let action = match verb {
        "sort" => Action::Sort,
        "select" if !rest.is_empty() => Action::Select(rest.to_string()),
        "select" => return Err("usage: select <id>".to_string()),
        "clear" => Action::Clear,
        "score" => Action::Score(rest.to_string()),
        "comment" => Action::Comment(rest.to_string()),
        "submit" => Action::Submit,
        "close" => Action::Close,
        "reload" => Action::Reload,
        "narrow" => match rest {
            "on" => Action::Narrow(true),
            "off" => Action::Narrow(false),
            _ => return Err("usage: narrow on|off".to_string()),
        },
        "help" | "?" => Action::Help,
        "quit" | "exit" | "q" => Action::Quit,
        other => return Err(format!("unknown command {other:?}, try help")),
    };
    Ok(action)
}

/// Apply one action, writing notices and in-flight frames to `out`.
/// Returns `false` once the session should end.
pub async fn apply(
    page: &mut CatalogPage,
    action: Action,
    out: &mut impl Write,
) -> io::Result<bool> {
    match action {
        Action::Sort => {
            let direction = page.toggle_sort();
            debug!(direction = direction.as_str(), "Sort toggled");
        }
        Action::Select(id) => {
            let known = page.catalog().snapshot().await.movies.iter().any(|m| m.id == id);
            if known {
                page.click_row(&id).await;
            } else {
                writeln!(out, "No movie with id {id:?}")?;
            }
        }
        Action::Clear => page.clear_selection().await,
        Action::Score(text) => match page.form_mut() {
            Some(form) => {
                if !form.input_score(&text).await {
                    writeln!(out, "Score accepts digits only")?;
                }
            }
            None => writeln!(out, "Select a movie first")?,
        },
        Action::Comment(text) => match page.form_mut() {
            Some(form) => form.input_comment(&text).await,
            None => writeln!(out, "Select a movie first")?,
        },
        Action::Submit => {
            let Some(form) = page.form_mut() else {
                writeln!(out, "Select a movie first")?;
                return Ok(true);
            };
            let pending = match form.start_submit().await {
                Ok(pending) => pending,
                Err(err) => {
                    debug!(error = %err, "Review not sent");
                    return Ok(true);
                }
            };
            write!(out, "{}", render::render_page(&page.view().await))?;

            let result = pending.send().await;
            if let Some(form) = page.form_mut() {
                form.finish(&result).await;
            }
            if let Err(err) = result {
                warn!(error = %err, "Review submission failed");
            }
        }
        Action::Close => {
            if page.close_form() {
                tokio::time::sleep(CLOSE_TRANSITION).await;
                page.finish_close_transition().await;
            } else {
                writeln!(out, "Nothing to close")?;
            }
        }
        Action::Reload => {
            info!("Reloading catalog");
            load(page, out).await?;
        }
        Action::Narrow(narrow) => page.set_narrow(narrow),
        Action::Help => writeln!(out, "{HELP}")?,
        Action::Quit => return Ok(false),
    }
    Ok(true)
}

/// Load the catalog, drawing the busy page while the fetch is pending.
pub async fn load(page: &mut CatalogPage, out: &mut impl Write) -> io::Result<()> {
    let pending = page.begin_load().await;
    write!(out, "{}", render::render_page(&page.view().await))?;
    if let Err(err) = pending.run().await {
        warn!(error = %err, "Catalog load failed");
    }
    Ok(())
}

pub async fn run(mut page: CatalogPage) -> anyhow::Result<()> {
    let mut out = io::stdout();
    load(&mut page, &mut out).await?;
    write!(out, "{}", render::render_page(&page.view().await))?;
    writeln!(out, "Type help for commands.")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let action = match parse_action(&line) {
            Ok(action) => action,
            Err(usage) => {
                writeln!(out, "{usage}")?;
                continue;
            }
        };
        if !apply(&mut page, action, &mut out).await? {
            break;
        }
        write!(out, "{}", render::render_page(&page.view().await))?;
        out.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_flow::{
        CompanyId, Endpoint, FormVariant, InMemoryMovieService, MovieCompany, RawMovie,
        review_form::SUBMISSION_FAILED_MESSAGE,
    };
    use serde_json::Value;
    use std::sync::Arc;

    fn page(service: &InMemoryMovieService) -> CatalogPage {
        CatalogPage::new(Arc::new(service.clone()))
    }

    fn service() -> InMemoryMovieService {
        let raw = |id: &str, reviews: Vec<f64>| RawMovie {
            id: id.to_string(),
            reviews,
            title: format!("Movie {id}"),
            film_company_id: "c1".to_string(),
            cost: Value::Null,
            release_year: Value::Null,
        };
        InMemoryMovieService::new(
            vec![raw("1", vec![4.0]), raw("2", vec![8.0])],
            Some(vec![MovieCompany {
                id: CompanyId::new("c1"),
                name: "Acme".into(),
            }]),
        )
    }

    #[test]
    fn test_parse_actions() {
        assert_eq!(parse_action("sort"), Ok(Action::Sort));
        assert_eq!(parse_action(" select 12 "), Ok(Action::Select("12".into())));
        assert_eq!(
            parse_action("comment a fine film"),
            Ok(Action::Comment("a fine film".into()))
        );
        assert_eq!(parse_action("score"), Ok(Action::Score(String::new())));
        assert_eq!(parse_action("narrow on"), Ok(Action::Narrow(true)));
        assert_eq!(parse_action("q"), Ok(Action::Quit));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_action("select").is_err());
        assert!(parse_action("narrow maybe").is_err());
        assert!(parse_action("dance").is_err());
    }

    async fn step(page: &mut CatalogPage, action: Action) -> (bool, String) {
        let mut out = Vec::new();
        let keep_going = apply(page, action, &mut out).await.unwrap();
        (keep_going, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_review_through_actions() {
        let service = service();
        service.set_response_message(Some("Saved")).await;
        let mut page = page(&service);
        page.load().await.unwrap();

        assert!(step(&mut page, Action::Select("1".into())).await.0);
        step(&mut page, Action::Score("9".into())).await;
        step(&mut page, Action::Comment("Nice".into())).await;
        step(&mut page, Action::Submit).await;

        let form = page.view().await.form.unwrap();
        assert_eq!(form.response_message.as_deref(), Some("Saved"));
        assert_eq!(form.comment, "");
        assert_eq!(service.submitted().await[0].comment, "Nice");
    }

    #[tokio::test]
    async fn test_submit_draws_busy_form_before_response() {
        let service = service();
        service.set_response_message(Some("Saved")).await;
        let mut page = page(&service);
        page.load().await.unwrap();

        step(&mut page, Action::Select("1".into())).await;
        step(&mut page, Action::Score("9".into())).await;
        let (_, frame) = step(&mut page, Action::Submit).await;

        assert!(frame.contains("[Submit (disabled)] submitting..."));
        assert!(!frame.contains("Saved"));
    }

    #[tokio::test]
    async fn test_reload_draws_loading_frame() {
        let service = service();
        let mut page = page(&service);
        page.load().await.unwrap();

        let (_, frame) = step(&mut page, Action::Reload).await;
        assert!(frame.contains("Loading..."));
        assert!(frame.contains("Total movies: 0"));

        let view = page.view().await;
        assert!(!view.busy);
        assert_eq!(view.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_submit_draws_no_frame() {
        let service = service();
        let mut page = page(&service);
        page.load().await.unwrap();

        step(&mut page, Action::Select("1".into())).await;
        let (_, frame) = step(&mut page, Action::Submit).await;
        assert!(frame.is_empty());
        assert_eq!(service.calls(Endpoint::SubmitReview).await, 0);
        assert!(page.view().await.form.unwrap().score_error.is_some());
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_session_running() {
        let service = service();
        service.fail_next(Endpoint::SubmitReview, "offline").await;
        let mut page = page(&service);
        page.load().await.unwrap();

        step(&mut page, Action::Select("2".into())).await;
        step(&mut page, Action::Score("3".into())).await;
        assert!(step(&mut page, Action::Submit).await.0);
        let form = page.view().await.form.unwrap();
        assert_eq!(form.failure_message, Some(SUBMISSION_FAILED_MESSAGE));
        assert_eq!(form.score, "3");
    }

    #[tokio::test]
    async fn test_unknown_movie_is_reported() {
        let service = service();
        let mut page = page(&service);
        page.load().await.unwrap();

        let (_, notice) = step(&mut page, Action::Select("42".into())).await;
        assert_eq!(notice, "No movie with id \"42\"\n");
        assert!(page.selected().is_none());
    }

    #[tokio::test]
    async fn test_close_modal_clears_selection() {
        let service = service();
        let mut page = page(&service);
        page.load().await.unwrap();

        step(&mut page, Action::Narrow(true)).await;
        step(&mut page, Action::Select("1".into())).await;
        assert_eq!(page.form().unwrap().variant(), FormVariant::Modal);

        step(&mut page, Action::Close).await;
        assert!(page.selected().is_none());
        assert!(page.form().is_none());
    }

    #[tokio::test]
    async fn test_quit_ends_session() {
        let service = service();
        let mut page = page(&service);
        assert!(!step(&mut page, Action::Quit).await.0);
    }
}
