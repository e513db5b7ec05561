use super::CancelToken;
use crate::dictionary::Dictionary;
use crate::models::SimpleWord;
use rayon::prelude::*;
use rayon::ThreadPool;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    /// Page count of the group about to be fetched
    SetProgress(usize),
    Tick,
    DoneGroup { group: String, words: Vec<SimpleWord> },
    Done,
}

/// Fetch every page of each group concurrently on the pool.
///
/// A failed page counts as empty and a failed page count as zero pages.
pub fn fetch_remote_words<F>(
    pool: &ThreadPool,
    dict: &dyn Dictionary,
    groups: &[(String, i64)],
    cancel: &CancelToken,
    on_event: F,
) -> Vec<SimpleWord>
where
    F: Fn(FetchEvent) + Sync,
{
    let mut all = Vec::new();

    for (group_name, group_id) in groups {
        if cancel.is_cancelled() {
            log::info!("Word fetch cancelled");
            break;
        }

        let total = dict.total_pages(group_name, *group_id).unwrap_or_else(|e| {
            log::error!("Failed to count pages of group {}: {}", group_name, e);
            0
        });
        on_event(FetchEvent::SetProgress(total));

        let pages: Vec<Vec<SimpleWord>> = pool.install(|| {
            (0..total)
                .into_par_iter()
                .map(|page| {
                    if cancel.is_cancelled() {
                        return Vec::new();
                    }
                    let words = dict
                        .words_by_page(page, group_name, *group_id)
                        .unwrap_or_else(|e| {
                            log::error!("Failed to fetch page {} of group {}: {}", page + 1, group_name, e);
                            Vec::new()
                        });
                    on_event(FetchEvent::Tick);
                    words
                })
                .collect()
        });

        let words: Vec<SimpleWord> = pages.into_iter().flatten().collect();
        log::info!("Group {}: {} words", group_name, words.len());
        for word in &words {
            log::debug!("{}", word.describe());
        }
        all.extend(words.iter().cloned());
        on_event(FetchEvent::DoneGroup {
            group: group_name.clone(),
            words,
        });
    }

    on_event(FetchEvent::Done);
    all
}
