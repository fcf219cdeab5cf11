use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("unsupported scheme {0:?}, only http is fetched")]
    UnsupportedScheme(String),
    #[error("URL has no host: {0}")]
    MissingHost(String),
    #[error("could not resolve {0}")]
    Unresolved(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("invalid seed URL {url:?}: {source}")]
    InvalidSeed {
        url: String,
        source: url::ParseError,
    },
    #[error("unsupported seed scheme {0:?}, only http is crawled")]
    UnsupportedScheme(String),
    #[error(transparent)]
    Queue(#[from] wordhunt_core::Error),
}
