use super::{page_count, Dictionary, DictionaryError, Session};
use crate::config::CredentialPlatform;
use crate::http::{build_client, cookie_header, Cookie, RetryPolicy};
use crate::models::SimpleWord;
use reqwest::blocking::Client;
use reqwest::header::COOKIE;
use serde::Deserialize;
use std::time::Duration;

pub const NAME: &str = "有道词典";

const LOGIN_URL: &str = "http://account.youdao.com/login?service=dict&back_url=http://dict.youdao.com/wordbook/wordlist%3Fkeyfrom%3Dnull";
const ACCOUNT_URL: &str = "https://dict.youdao.com/login/acc/query/accountinfo";
const BOOKS_URL: &str = "https://dict.youdao.com/wordbook/webapi/books";
const WORDS_URL: &str = "https://dict.youdao.com/wordbook/webapi/words";
const WORDS_PER_PAGE: u64 = 15;
const SESSION_COOKIE: &str = "DICT_SESS";

#[derive(Debug, Deserialize)]
struct AccountInfo {
    code: i64,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Book {
    book_id: i64,
    book_name: String,
}

#[derive(Debug, Deserialize)]
struct WordPage {
    total: u64,
    #[serde(rename = "itemList", default)]
    item_list: Vec<Item>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    word: String,
    #[serde(default)]
    trans: String,
    #[serde(default)]
    modified_time: i64,
    #[serde(default)]
    book_id: i64,
    #[serde(default)]
    book_name: String,
}

impl From<Item> for SimpleWord {
    fn from(item: Item) -> Self {
        SimpleWord {
            term: item.word,
            trans: item.trans,
            modified_time: item.modified_time,
            book_id: item.book_id,
            book_name: item.book_name,
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, DictionaryError> {
    serde_json::from_str(body).map_err(|e| DictionaryError::Parse {
        service: NAME,
        message: e.to_string(),
    })
}

fn parse_groups(body: &str) -> Result<Vec<(String, i64)>, DictionaryError> {
    let books: Envelope<Vec<Book>> = parse(body)?;
    Ok(books.data.into_iter().map(|b| (b.book_name, b.book_id)).collect())
}

fn parse_words(body: &str) -> Result<WordPage, DictionaryError> {
    Ok(parse::<Envelope<WordPage>>(body)?.data)
}

/// Youdao word book
pub struct Youdao {
    client: Client,
    retry: RetryPolicy,
    session: Session,
}

impl Youdao {
    pub fn new() -> Result<Self, DictionaryError> {
        Ok(Self {
            client: build_client(Duration::from_secs(10))?,
            retry: RetryPolicy::default(),
            session: Session::default(),
        })
    }

    fn get_words(&self, group_id: i64, limit: u64, offset: u64) -> Result<WordPage, DictionaryError> {
        let cookie = self.session.header(NAME)?;
        let params = [
            ("bookId", group_id.to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        let body = self
            .retry
            .send(|| self.client.get(WORDS_URL).header(COOKIE, &cookie).query(&params))?
            .text()?;
        parse_words(&body)
    }
}

impl Dictionary for Youdao {
    fn name(&self) -> &'static str {
        NAME
    }

    fn platform(&self) -> CredentialPlatform {
        CredentialPlatform::Youdao
    }

    fn login_url(&self) -> String {
        LOGIN_URL.to_string()
    }

    fn login_check(&self, cookie: &Cookie, _content: &str) -> bool {
        cookie.contains_key(SESSION_COOKIE)
    }

    fn check_cookie(&self, cookie: &Cookie) -> Result<bool, DictionaryError> {
        if cookie.is_empty() {
            return Ok(false);
        }
        let header = cookie_header(cookie);
        let body = self
            .retry
            .send(|| self.client.get(ACCOUNT_URL).header(COOKIE, &header))?
            .text()?;

        let valid = serde_json::from_str::<AccountInfo>(&body)
            .map(|info| info.code == 0)
            .unwrap_or(false);
        if valid {
            log::info!("Cookie is valid");
            self.session.set(cookie);
        } else {
            log::info!("Cookie is invalid");
        }
        Ok(valid)
    }

    fn groups(&self) -> Result<Vec<(String, i64)>, DictionaryError> {
        let cookie = self.session.header(NAME)?;
        let body = self
            .retry
            .send(|| self.client.get(BOOKS_URL).header(COOKIE, &cookie))?
            .text()?;
        let groups = parse_groups(&body)?;
        log::info!("Word book groups: {:?}", groups);
        Ok(groups)
    }

    fn total_pages(&self, group_name: &str, group_id: i64) -> Result<usize, DictionaryError> {
        let page = self.get_words(group_id, 1, 0)?;
        let pages = page_count(page.total, WORDS_PER_PAGE);
        log::info!("Group {}({}) has {} pages", group_name, group_id, pages);
        Ok(pages)
    }

    fn words_by_page(
        &self,
        page: usize,
        group_name: &str,
        group_id: i64,
    ) -> Result<Vec<SimpleWord>, DictionaryError> {
        log::info!("Fetching group {}({}) page {}", group_name, group_id, page + 1);
        let result = self.get_words(group_id, WORDS_PER_PAGE, page as u64 * WORDS_PER_PAGE)?;
        Ok(result.item_list.into_iter().map(SimpleWord::from).collect())
    }
}
