#[derive(clap::ValueEnum, Clone, Debug, Copy)]
pub enum CargoEnv {
    Development,
    Production,
}

#[derive(clap::Parser, Clone, Debug)]
pub struct AppConfig {
    // production or development
    #[clap(long, env, value_enum)]
    pub cargo_env: CargoEnv,

    // port that the app will bind to
    #[clap(long, env, default_value = "5000")]
    pub port: u16,

    // json file holding the video catalog, a missing file just means an empty catalog
    #[clap(long, env, default_value = "catalog.json")]
    pub catalog_path: String,

    // user agent sent upstream when the client didn't send one of its own
    #[clap(
        long,
        env,
        default_value = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
    )]
    pub upstream_user_agent: String,

    // the referer/origin pair the origin expects. when unset the upstream url's own origin is
    // sent, which is what most hotlink checks want anyway
    #[clap(long, env)]
    pub upstream_referer: Option<String>,

    #[clap(long, env)]
    pub upstream_origin: Option<String>,

    // bounds connect + response head, the body itself can stream for as long as it needs
    #[clap(long, env, default_value = "30")]
    pub upstream_timeout_secs: u64,

    // 0 turns redirect following off, a 3xx then counts as a rejected upstream
    #[clap(long, env, default_value = "5")]
    pub upstream_max_redirects: usize,

    // chunk size for /stream responses
    #[clap(long, env, default_value = "8192")]
    pub stream_chunk_size: usize,

    // chunk size for /segment responses, segments are most of the traffic so keep it bigger
    #[clap(long, env, default_value = "65536")]
    pub segment_chunk_size: usize,

    // playlists are buffered to be rewritten, anything bigger than this isn't a playlist
    #[clap(long, env, default_value = "4194304")]
    pub max_playlist_bytes: usize,

    // this should be either * for allowing everything, or a comma seperated list of domains like
    // example.com,something.com. only applies to the json api, the relay routes are always *
    #[clap(long, env, default_value = "*")]
    pub cors_origin: String,

    // optional sentry integration
    #[clap(long, env)]
    pub sentry_dsn: Option<String>,
}

impl Default for AppConfig {
    // mirrors the clap defaults, mostly used by the tests
    fn default() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            port: 5000,
            catalog_path: "catalog.json".to_string(),
            upstream_user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            upstream_referer: None,
            upstream_origin: None,
            upstream_timeout_secs: 30,
            upstream_max_redirects: 5,
            stream_chunk_size: 8 * 1024,
            segment_chunk_size: 64 * 1024,
            max_playlist_bytes: 4 * 1024 * 1024,
            cors_origin: "*".to_string(),
            sentry_dsn: None,
        }
    }
}
