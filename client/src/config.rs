/// Tile contract on Base.
pub const CONTRACT_ADDRESS: &str = "0xdD7bEC58d509C5F42DeA2b05684e0bE2e1b3C12a";
pub const CHAIN_ID: u64 = 8453;
pub const CHAIN_NAME: &str = "Base";

/// Public read-only RPC endpoints, rotated through when one fails.
pub const RPC_ENDPOINTS: &[&str] = &[
    "https://mainnet.base.org",
    "https://base-rpc.publicnode.com",
    "https://base.drpc.org",
];

/// Explorer page opened after a successful mint.
pub const TX_EXPLORER_BASE: &str = "https://base.blockscout.com/tx/";
/// Indexer consulted as the metadata source of last resort.
pub const INDEXER_API_BASE: &str = "https://base.blockscout.com/api/v2";

/// Generic sold marker shown while a tile's art is unresolved.
pub const SOLD_MARKER_URL: &str = "https://rosebud.ai/assets/Base_Logo_1.png?WWz6";

/// Ambient loop, toggled from the header button.
pub const AUDIO_URL: &str = "/ambient.mp3";
pub const AUDIO_STORAGE_KEY: &str = "baseland_audio_on";
pub const AUDIO_VOLUME: f64 = 0.15;

/// Cadence of the placeholder re-resolution pass.
pub const REFRESH_INTERVAL_MS: u32 = 15_000;
/// Cadence of the live mint poll running over the read-only provider.
pub const LIVE_POLL_MS: u32 = 4_000;
/// In-flight metadata resolutions during history replay.
pub const REPLAY_CONCURRENCY: usize = 12;
/// In-flight metadata resolutions during the refresh pass.
pub const REFRESH_CONCURRENCY: usize = 6;

/// Pixels per tile at scale 1.
pub const BASE_TILE_PX: f64 = 8.0;
pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 6.0;
/// Tiles visible across the short axis after the initial auto-fit.
pub const INITIAL_FIT_TILES: f64 = 30.0;
/// Strength of the mouse-follow auto-pan.
pub const AUTOPAN_FACTOR: f64 = 0.015;

/// Board palette.
pub const OWNED_COLOR: &str = "#1652F0";
pub const EMPTY_COLOR: &str = "#111111";
pub const LINE_COLOR: &str = "#FFFFFF";
