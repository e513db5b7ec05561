// Note commands: sync, fill-missing, download-missing, templates

use crate::cli::commands::{confirm, logged_in_dictionary, App};
use crate::cli::error::*;
use crate::cli::output::{format_sync_report, format_word_list, Progress};
use crate::dictionary::DICTIONARIES;
use crate::http::{AssetFetcher, HttpFetcher};
use crate::models::{Note, NoteType, SimpleWord};
use crate::notes::*;
use crate::query::{create_query_api, QueryApi};
use crate::repo::{DeckRepo, NoteRepo};
use crate::utils::fuzzy::find_near_matches;
use crate::utils::{get_audio, is_audio_file_missing, is_image_file_missing, read_words_from_file, set_sub_ignore_case};
use crate::workers::{
    download_assets, fetch_remote_words, run_queries, CancelToken, DownloadEvent, DownloadRequest,
    FetchEvent, QueryEvent, QueryOptions, QueryOutcome, WorkerPools,
};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

pub struct SyncOptions {
    pub groups: Vec<String>,
    pub from_file: Vec<PathBuf>,
    pub only: Vec<String>,
    pub delete: bool,
    pub yes: bool,
    pub dry_run: bool,
}

/// Words to add (in source order) and deck terms to delete (in deck order)
#[derive(Debug, Default, PartialEq)]
pub(crate) struct SyncPlan {
    pub to_add: Vec<SimpleWord>,
    pub to_delete: Vec<String>,
}

/// Drop blank terms and repeated terms (case-insensitive), keeping the first
pub(crate) fn dedup_words(words: Vec<SimpleWord>) -> Vec<SimpleWord> {
    let mut seen = HashSet::new();
    words
        .into_iter()
        .filter(|w| !w.term.trim().is_empty() && seen.insert(w.term.to_lowercase()))
        .collect()
}

/// Diff source words against the deck's terms, case-insensitively.
/// A non-empty `only` restricts the additions to those terms.
pub(crate) fn plan_sync(remote: Vec<SimpleWord>, local: &[String], only: &[String]) -> SyncPlan {
    let remote_terms: Vec<String> = remote.iter().map(|w| w.term.clone()).collect();
    let new_terms = set_sub_ignore_case(&remote_terms, local);
    let gone_terms = set_sub_ignore_case(local, &remote_terms);
    let only: HashSet<String> = only.iter().map(|t| t.to_lowercase()).collect();

    let to_add = remote
        .into_iter()
        .filter(|w| new_terms.contains(&w.term))
        .filter(|w| only.is_empty() || only.contains(&w.term.to_lowercase()))
        .collect();

    let mut seen = HashSet::new();
    let to_delete = local
        .iter()
        .filter(|t| gone_terms.contains(*t) && seen.insert(t.to_lowercase()))
        .cloned()
        .collect();

    SyncPlan { to_add, to_delete }
}

fn words_from_files(paths: &[PathBuf]) -> Result<Vec<SimpleWord>> {
    let mut words = Vec::new();
    for path in paths {
        if !path.is_file() {
            user_error(&format!("Word list not found: {}", path.display()));
        }
        let rows = read_words_from_file(path)?;
        log::info!("Read {} words from {}", rows.len(), path.display());
        words.extend(rows.iter().filter_map(|r| SimpleWord::from_values(r)));
    }
    Ok(words)
}

fn fetch_group_words(
    app: &mut App,
    pools: &WorkerPools,
    requested: &[String],
    cancel: &CancelToken,
) -> Result<Vec<SimpleWord>> {
    let dict = logged_in_dictionary(&app.config, pools)?;
    let available = dict
        .groups()
        .with_context(|| format!("Failed to fetch word-book groups from {}", dict.name()))?;
    let names: Vec<String> = available.iter().map(|(n, _)| n.clone()).collect();

    let wanted = if requested.is_empty() {
        app.config.groups_for(app.config.selected_dict)
    } else {
        requested.to_vec()
    };
    if wanted.is_empty() {
        user_error("No word-book groups selected. Pass --group <name> (see `dict2deck groups`).");
    }

    let mut selected = Vec::new();
    for name in &wanted {
        match available.iter().find(|(n, _)| n == name) {
            Some(group) => selected.push(group.clone()),
            None => user_error(&not_found_message("Group", name, &names)),
        }
    }
    if !requested.is_empty() {
        let dict_index = app.config.selected_dict;
        app.config.set_groups_for(dict_index, wanted, DICTIONARIES.len());
    }

    let progress = Progress::new("Fetching pages", 0);
    let words = fetch_remote_words(&pools.work, dict.as_ref(), &selected, cancel, |event| match event {
        FetchEvent::SetProgress(pages) => progress.add_total(pages),
        FetchEvent::Tick => progress.tick(),
        FetchEvent::DoneGroup { group, words } => {
            log::info!("Fetched {} words from group {}", words.len(), group)
        }
        FetchEvent::Done => progress.finish(),
    });
    Ok(words)
}

/// The selected query API, configured with the stored token
fn query_api(app: &App) -> Result<Box<dyn QueryApi>> {
    validate_api_index(app.config.selected_api).unwrap_or_else(|e| user_error(&e));
    if app.config.apora_api_token.trim().is_empty() {
        user_error("API token is not set. Run `dict2deck config set aporaApiToken <token>` first.");
    }
    create_query_api(app.config.selected_api, &app.config).context("Failed to create query API client")
}

/// Query a batch; `None` when the user declines to go on after failures
fn query_words(
    api: &dyn QueryApi,
    words: Vec<(SimpleWord, usize)>,
    yes: bool,
) -> Result<Option<QueryOutcome>> {
    let terms: BTreeMap<usize, String> = words.iter().map(|(w, row)| (*row, w.term.clone())).collect();
    let progress = Progress::new("Querying", words.len());
    let outcome = run_queries(api, words, &QueryOptions::default(), &CancelToken::new(), |event| {
        if event == QueryEvent::Tick {
            progress.tick();
        }
    })?;
    progress.finish();

    if outcome.insufficient_balance {
        eprintln!("Warning: insufficient API balance, the remaining words were not queried.");
    }
    if !outcome.failed.is_empty() {
        let failed: Vec<String> = outcome
            .failed
            .iter()
            .filter_map(|row| terms.get(row).cloned())
            .collect();
        print!("{}", format_word_list("Query failed", &failed));
        if !outcome.succeeded.is_empty()
            && !confirm(
                &format!("Continue with the {} words that were queried?", outcome.succeeded.len()),
                yes,
            )?
        {
            println!("Cancelled.");
            return Ok(None);
        }
    }
    Ok(Some(outcome))
}

fn download_audio(
    app: &App,
    pools: &WorkerPools,
    fetcher: &dyn AssetFetcher,
    audios: Vec<(String, String)>,
) -> Result<()> {
    if audios.is_empty() {
        return Ok(());
    }
    let request = DownloadRequest::new(app.media.path(), Vec::new(), audios);
    let progress = Progress::new("Downloading", request.len());
    let summary = download_assets(&pools.assets, fetcher, &request, &CancelToken::new(), |event| {
        if event == DownloadEvent::Tick {
            progress.tick();
        }
    });
    progress.finish();

    println!("Downloaded: {}, Skipped: {}", summary.downloaded, summary.skipped);
    if !summary.failed.is_empty() {
        print!("{}", format_word_list("Download failed", &summary.failed));
    }
    Ok(())
}

/// Note type for new notes, created with its template and media on first use
fn prepare_note_type(app: &App) -> Result<NoteType> {
    let config = &app.config;
    let fg = config.field_group();
    let (mut note_type, created, _) = get_or_create_note_type(
        &app.conn,
        model_name(config.enable_context),
        !config.enable_context,
        false,
    )?;
    if created {
        add_normal_template(&app.conn, &mut note_type, &fg)?;
        app.media.install_bundled_assets()?;
    } else if config.sync_templates {
        reset_templates(&app.conn, &mut note_type, &fg)?;
    }
    Ok(note_type)
}

/// Add a note for every queried word, then download its audio
fn add_new_notes(
    app: &App,
    pools: &WorkerPools,
    fetcher: &dyn AssetFetcher,
    outcome: &QueryOutcome,
) -> Result<usize> {
    if outcome.succeeded.is_empty() {
        return Ok(0);
    }
    let mut note_type = prepare_note_type(app)?;
    let deck = get_or_create_deck(&app.conn, &app.config.deck, &mut note_type)?;
    let preferred = app.config.preferred_pronunciation();

    let mut audios = Vec::new();
    for result in outcome.succeeded.values() {
        let (task, variant, _) = asset_download_task(result, preferred);
        add_note_to_deck(
            &app.conn,
            &app.config,
            result,
            variant,
            NoteTarget::New {
                deck: &deck,
                note_type: &note_type,
            },
        )?;
        audios.extend(task);
    }

    download_audio(app, pools, fetcher, audios)?;
    Ok(outcome.succeeded.len())
}

fn delete_notes(app: &App, terms: &[String], yes: bool) -> Result<usize> {
    let Some(deck_id) = DeckRepo::get_by_name(&app.conn, &app.config.deck)?.and_then(|d| d.id) else {
        return Ok(0);
    };
    if !confirm(
        &format!("Delete {} notes whose words are no longer in the word book?", terms.len()),
        yes,
    )? {
        println!("Skipped deletion.");
        return Ok(0);
    }

    let mut ids = Vec::new();
    for term in terms {
        if let Some(id) = NoteRepo::find_by_term(&app.conn, deck_id, term)? {
            ids.push(id);
        }
    }
    NoteRepo::delete_many(&app.conn, &ids)
}

pub(crate) fn handle_sync(opts: SyncOptions) -> Result<()> {
    let mut app = App::open()?;
    if validate_non_empty(&app.config.deck, "Deck").is_err() {
        user_error("No deck configured. Run `dict2deck config set deck <name>` first.");
    }
    let pools = WorkerPools::new()?;
    let cancel = CancelToken::new();

    let remote = if opts.from_file.is_empty() {
        fetch_group_words(&mut app, &pools, &opts.groups, &cancel)?
    } else {
        words_from_files(&opts.from_file)?
    };

    let local = match DeckRepo::get_by_name(&app.conn, &app.config.deck)?.and_then(|d| d.id) {
        Some(deck_id) => NoteRepo::terms_in_deck(&app.conn, deck_id, MODEL_NAME)?,
        None => {
            let names = DeckRepo::list_names(&app.conn)?;
            let near = find_near_matches(&app.config.deck, &names, 2);
            if !near.is_empty() {
                let similar: Vec<&str> = near.iter().map(|(n, _)| n.as_str()).collect();
                eprintln!(
                    "Note: deck '{}' will be created (similar decks: {}).",
                    app.config.deck,
                    similar.join(", ")
                );
            }
            Vec::new()
        }
    };

    let plan = plan_sync(dedup_words(remote), &local, &opts.only);
    let add_terms: Vec<String> = plan.to_add.iter().map(|w| w.term.clone()).collect();
    print!("{}", format_word_list("New words", &add_terms));
    print!("{}", format_word_list("Words to delete", &plan.to_delete));

    if opts.dry_run {
        return Ok(());
    }
    let (changed, card_settings_changed) = app
        .config
        .save_if_changed(&app.config_path)
        .context("Failed to save settings")?;
    log::debug!("Settings changed: {}, card settings changed: {}", changed, card_settings_changed);

    let mut added = 0;
    if !plan.to_add.is_empty() {
        let rows = plan
            .to_add
            .into_iter()
            .enumerate()
            .map(|(row, word)| (word, row))
            .collect();
        let api = query_api(&app)?;
        let Some(outcome) = query_words(api.as_ref(), rows, opts.yes)? else {
            return Ok(());
        };
        added = add_new_notes(&app, &pools, &HttpFetcher::new()?, &outcome)?;
    }

    let deleted = if opts.delete && !plan.to_delete.is_empty() {
        delete_notes(&app, &plan.to_delete, opts.yes)?
    } else {
        0
    };

    println!("{}", format_sync_report(added, deleted));
    Ok(())
}

/// Notes of this tool's note types that have a term
fn tool_notes(app: &App) -> Result<Vec<Note>> {
    let note_types = required_note_types(app)?;
    let mut notes = Vec::new();
    for nt in note_types {
        if let Some(id) = nt.id {
            notes.extend(NoteRepo::find_by_note_type(&app.conn, id)?);
        }
    }
    notes.retain(|n| !n.get("term").trim().is_empty());
    Ok(notes)
}

fn required_note_types(app: &App) -> Result<Vec<NoteType>> {
    let note_types = existing_note_types(&app.conn)?;
    if note_types.is_empty() {
        user_error(&format!(
            "Note type '{}' does not exist. Run `dict2deck sync` first.",
            MODEL_NAME
        ));
    }
    Ok(note_types)
}

pub(crate) fn handle_fill_missing(yes: bool) -> Result<()> {
    let app = App::open()?;
    let mut notes = tool_notes(&app)?;
    if notes.is_empty() {
        println!("No notes to fill.");
        return Ok(());
    }
    if !confirm(&format!("Query {} notes and fill their empty fields?", notes.len()), yes)? {
        println!("Cancelled.");
        return Ok(());
    }

    let rows = notes
        .iter()
        .enumerate()
        .map(|(row, note)| (SimpleWord::new(note.get("term")), row))
        .collect();
    let api = query_api(&app)?;
    let Some(outcome) = query_words(api.as_ref(), rows, yes)? else {
        return Ok(());
    };

    let pools = WorkerPools::new()?;
    let preferred = app.config.preferred_pronunciation();
    let mut audios = Vec::new();
    for (row, result) in &outcome.succeeded {
        let (task, variant, _) = asset_download_task(result, preferred);
        add_note_to_deck(
            &app.conn,
            &app.config,
            result,
            variant,
            NoteTarget::Existing {
                note: &mut notes[*row],
                overwrite: false,
            },
        )?;
        audios.extend(task);
    }
    download_audio(&app, &pools, &HttpFetcher::new()?, audios)?;

    println!("Updated: {}", outcome.succeeded.len());
    Ok(())
}

pub(crate) fn handle_download_missing(yes: bool) -> Result<()> {
    let app = App::open()?;
    let notes = tool_notes(&app)?;
    let media = app.media.path();

    let missing: Vec<&Note> = notes
        .iter()
        .filter(|n| {
            is_image_file_missing(n.get("image"), media) || is_audio_file_missing(n.get("pronunciation"), media)
        })
        .collect();
    if missing.is_empty() {
        println!("[All clear] Nothing to do.");
        return Ok(());
    }

    let terms: Vec<String> = missing.iter().map(|n| n.get("term").to_string()).collect();
    print!("{}", format_word_list("Missing assets", &terms));
    if !confirm(&format!("Query and download assets for {} notes?", missing.len()), yes)? {
        println!("Cancelled.");
        return Ok(());
    }

    for note in missing.iter().filter(|n| is_image_file_missing(n.get("image"), media)) {
        log::warn!("No image source available for {}", note.get("term"));
    }

    let rows = missing
        .iter()
        .enumerate()
        .map(|(row, note)| (SimpleWord::new(note.get("term")), row))
        .collect();
    let api = query_api(&app)?;
    let Some(outcome) = query_words(api.as_ref(), rows, yes)? else {
        return Ok(());
    };

    let preferred = app.config.preferred_pronunciation();
    let mut audios = Vec::new();
    for (row, result) in &outcome.succeeded {
        let (task, _, _) = asset_download_task(result, preferred);
        if let Some((default_name, url)) = task {
            // Keep the file name the note already refers to
            let referenced = get_audio(missing[*row].get("pronunciation"));
            let filename = if referenced.is_empty() { default_name } else { referenced };
            audios.push((filename, url));
        }
    }

    let pools = WorkerPools::new()?;
    download_audio(&app, &pools, &HttpFetcher::new()?, audios)
}

pub(crate) fn handle_templates_check(reset: bool, yes: bool) -> Result<()> {
    let app = App::open()?;
    let fg = app.config.field_group();

    for mut note_type in required_note_types(&app)? {
        println!("Note type '{}':", note_type.name);

        let (fields_ok, unknown, missing) = check_fields(&note_type);
        if !fields_ok {
            if !unknown.is_empty() {
                println!("  Unknown fields: {}", unknown.into_iter().collect::<Vec<_>>().join(", "));
            }
            if !missing.is_empty() {
                println!("  Missing fields: {}", missing.into_iter().collect::<Vec<_>>().join(", "));
                if confirm("Add the missing fields?", yes)? && merge_fields(&app.conn, &mut note_type)? {
                    println!("  Fields merged.");
                }
            }
        }

        if check_templates(&note_type, &fg) && check_css(&note_type) {
            println!("  Templates and CSS match the defaults.");
            continue;
        }
        println!("  Templates or CSS have been changed.");
        if !reset {
            println!("  Run `dict2deck templates check --reset` to restore the defaults.");
            continue;
        }
        if confirm(
            &format!("Reset templates and CSS of '{}' to the defaults?", note_type.name),
            yes,
        )? {
            reset_templates(&app.conn, &mut note_type, &fg)?;
            println!("  Reset complete.");
        }
    }
    Ok(())
}

pub(crate) fn handle_templates_backwards(add: bool, yes: bool) -> Result<()> {
    let app = App::open()?;
    let fg = app.config.field_group();

    for mut note_type in required_note_types(&app)? {
        let exists = note_type.template(BACKWARDS_TEMPLATE_NAME).is_some();
        if add && exists {
            println!("'{}' already has a {} template.", note_type.name, BACKWARDS_TEMPLATE_NAME);
            continue;
        }
        if !add && !exists {
            println!("'{}' has no {} template.", note_type.name, BACKWARDS_TEMPLATE_NAME);
            continue;
        }

        let action = if add { "Add" } else { "Remove" };
        if !confirm(
            &format!("{} the {} template of '{}'?", action, BACKWARDS_TEMPLATE_NAME, note_type.name),
            yes,
        )? {
            println!("Cancelled.");
            continue;
        }
        if add {
            add_backwards_template(&app.conn, &mut note_type, &fg)?;
            println!("Added {} template to '{}'.", BACKWARDS_TEMPLATE_NAME, note_type.name);
        } else {
            remove_backwards_template(&app.conn, &mut note_type)?;
            println!("Removed {} template from '{}'.", BACKWARDS_TEMPLATE_NAME, note_type.name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::DbConnection;
    use crate::models::QueryResult;
    use crate::query::QueryError;
    use crate::repo::MediaDir;
    use tempfile::TempDir;

    /// Terms starting with "zz" have no result; the rest get an audio URL
    struct FakeApi;

    impl QueryApi for FakeApi {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn query(&self, word: &SimpleWord) -> Result<Option<QueryResult>, QueryError> {
            if word.term.starts_with("zz") {
                return Ok(None);
            }
            Ok(Some(QueryResult {
                definition: Some(format!("meaning of {}", word.term)),
                term_audio_url: Some(format!("https://audio/{}", word.term)),
                ..QueryResult::new(word.term.clone())
            }))
        }
    }

    struct FakeFetcher;

    impl AssetFetcher for FakeFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Ok(url.as_bytes().to_vec())
        }
    }

    fn test_app(temp_dir: &TempDir) -> App {
        App {
            conn: DbConnection::connect_in_memory().unwrap(),
            config: AppConfig {
                deck: "English".to_string(),
                disable_speaking: false,
                apora_api_token: "token".to_string(),
                ..Default::default()
            },
            config_path: temp_dir.path().join("config.json"),
            media: MediaDir::open(temp_dir.path().join("media")).unwrap(),
        }
    }

    fn words(terms: &[&str]) -> Vec<SimpleWord> {
        terms.iter().map(|t| SimpleWord::new(*t)).collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn terms(words: &[SimpleWord]) -> Vec<&str> {
        words.iter().map(|w| w.term.as_str()).collect()
    }

    #[test]
    fn test_dedup_words_keeps_first() {
        let deduped = dedup_words(words(&["Apple", "pear", "apple", " ", "PEAR", "fig"]));
        assert_eq!(terms(&deduped), vec!["Apple", "pear", "fig"]);
    }

    #[test]
    fn test_plan_sync_case_insensitive() {
        let plan = plan_sync(
            words(&["Apple", "pear", "fig"]),
            &strings(&["apple", "plum", "Plum"]),
            &[],
        );
        assert_eq!(terms(&plan.to_add), vec!["pear", "fig"]);
        assert_eq!(plan.to_delete, vec!["plum"]);
    }

    #[test]
    fn test_plan_sync_only_restricts_additions() {
        let plan = plan_sync(words(&["apple", "pear", "fig"]), &[], &strings(&["FIG"]));
        assert_eq!(terms(&plan.to_add), vec!["fig"]);
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_plan_sync_nothing_to_do() {
        let plan = plan_sync(words(&["apple"]), &strings(&["APPLE"]), &[]);
        assert_eq!(plan, SyncPlan::default());
    }

    #[test]
    fn test_new_notes_only_for_queried_words() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir);
        let pools = WorkerPools::new().unwrap();
        let rows = words(&["apple", "zzz", "and/or"])
            .into_iter()
            .enumerate()
            .map(|(row, word)| (word, row))
            .collect();

        let outcome = query_words(&FakeApi, rows, true).unwrap().unwrap();
        assert_eq!(outcome.failed.iter().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(add_new_notes(&app, &pools, &FakeFetcher, &outcome).unwrap(), 2);

        let deck_id = DeckRepo::get_by_name(&app.conn, "English").unwrap().unwrap().id.unwrap();
        let mut added = NoteRepo::terms_in_deck(&app.conn, deck_id, MODEL_NAME).unwrap();
        added.sort();
        assert_eq!(added, vec!["and/or", "apple"]);
        assert!(NoteRepo::find_by_term(&app.conn, deck_id, "zzz").unwrap().is_none());

        let notes = NoteRepo::find_by_deck(&app.conn, deck_id).unwrap();
        let sounds: Vec<&str> = notes.iter().map(|n| n.get("pronunciation")).collect();
        assert!(sounds.contains(&"[sound:D2D-apple.wav]"));
        assert!(sounds.contains(&"[sound:D2D-and_or.wav]"));
        for note in &notes {
            let filename = get_audio(note.get("pronunciation"));
            let data = std::fs::read(app.media.path().join(&filename)).unwrap();
            assert_eq!(data, format!("https://audio/{}", note.get("term")).into_bytes());
        }
    }

    #[test]
    fn test_nothing_added_when_every_query_fails() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir);
        let pools = WorkerPools::new().unwrap();

        let outcome = query_words(&FakeApi, vec![(SimpleWord::new("zzz"), 0)], true)
            .unwrap()
            .unwrap();
        assert!(outcome.succeeded.is_empty());
        assert_eq!(add_new_notes(&app, &pools, &FakeFetcher, &outcome).unwrap(), 0);
        assert!(DeckRepo::get_by_name(&app.conn, "English").unwrap().is_none());
    }
}
