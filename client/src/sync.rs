use futures::StreamExt;
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use futures::stream;
use gloo_timers::future::TimeoutFuture;
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::console;

use baseland_shared::{
    LOG_CHUNK_BLOCKS, MintedTile, TILE_COUNT, TOPIC_MINTED, TOPIC_TRANSFER, TOPIC_TRANSFER_SINGLE,
    block_chunks, decode_mint, is_placeholder_url, logs_filter, resolve_locator, short_address,
    tile_id,
};

use crate::art_cache::ArtCache;
use crate::board::TileBoard;
use crate::config::{CONTRACT_ADDRESS, LIVE_POLL_MS, REFRESH_CONCURRENCY, REPLAY_CONCURRENCY};
use crate::images::ImageStore;
use crate::indexer::WalletNft;
use crate::resolver::resolve_token_image;
use crate::rpc::RpcClient;
use crate::status::StatusBus;
use crate::wallet::WalletSession;

/// Everything that can change ownership state, as seen by the sync engine.
///
/// Producers (boot, replay, the live poll, the refresh interval, the buy
/// dialog) only enqueue these; the engine task is the sole writer of the
/// tile board, so events apply in arrival order without write races.
pub enum SyncEvent {
    /// Persisted cache entries, replayed once at startup.
    Hydrate(Vec<(u32, Option<String>)>),
    /// Mints decoded from one chunk of historical logs.
    ReplayBatch(Vec<MintedTile>),
    /// Historical replay finished; run the first reveal pass.
    ReplayDone,
    /// A mint observed by the live log poll.
    LiveMint(MintedTile),
    /// The connected wallet's holdings, straight from the indexer.
    WalletInventory(Vec<WalletNft>),
    /// The user's own mint transaction was accepted by the wallet.
    Purchased { x: u32, y: u32 },
    /// Periodic re-resolution of tiles without settled artwork.
    RefreshTick,
}

/// Sending half of the engine queue. Cheap to clone into callbacks.
#[derive(Clone)]
pub struct SyncHandle {
    tx: UnboundedSender<SyncEvent>,
}

impl SyncHandle {
    pub fn send(&self, event: SyncEvent) {
        // Fails only once the engine task is gone, i.e. at teardown.
        let _ = self.tx.unbounded_send(event);
    }
}

struct SyncEngine {
    board: RwSignal<TileBoard>,
    wallet: RwSignal<Option<WalletSession>>,
    cache: ArtCache,
    images: ImageStore,
    rpc: RpcClient,
    status: StatusBus,
}

/// Spawn the engine task and hand back its queue.
pub fn start(
    board: RwSignal<TileBoard>,
    wallet: RwSignal<Option<WalletSession>>,
    cache: ArtCache,
    images: ImageStore,
    rpc: RpcClient,
    status: StatusBus,
) -> SyncHandle {
    let (tx, rx) = unbounded();
    let engine = SyncEngine {
        board,
        wallet,
        cache,
        images,
        rpc,
        status,
    };
    spawn_local(engine.run(rx));
    SyncHandle { tx }
}

impl SyncEngine {
    async fn run(self, mut rx: UnboundedReceiver<SyncEvent>) {
        while let Some(event) = rx.next().await {
            match event {
                SyncEvent::Hydrate(entries) => self.hydrate(entries).await,
                SyncEvent::ReplayBatch(mints) => self.absorb_mints(mints).await,
                SyncEvent::ReplayDone | SyncEvent::RefreshTick => self.refresh_pending().await,
                SyncEvent::LiveMint(mint) => self.live_mint(mint).await,
                SyncEvent::WalletInventory(nfts) => self.wallet_inventory(nfts).await,
                SyncEvent::Purchased { x, y } => self.purchased(x, y),
            }
        }
    }

    /// Restore ownership from persisted cache entries before any network
    /// traffic. Tiles show the sold marker until their cached image decodes.
    async fn hydrate(&self, entries: Vec<(u32, Option<String>)>) {
        if entries.is_empty() {
            return;
        }
        self.board.update(|board| {
            for (id, _) in &entries {
                board.mark_owned(*id);
                board.mark_pending(*id);
            }
        });
        stream::iter(entries)
            .for_each_concurrent(REPLAY_CONCURRENCY, |(id, url)| async move {
                let Some(url) = url else { return };
                if self.images.load(&url).await.is_some() {
                    self.board.update(|board| board.set_display(id, url));
                }
            })
            .await;
    }

    /// Fold a batch of mint events into the board, then resolve artwork for
    /// the ones that have none, a bounded number at a time.
    async fn absorb_mints(&self, mints: Vec<MintedTile>) {
        let fresh: Vec<u32> = self.board.with_untracked(|board| {
            mints
                .iter()
                .map(|mint| tile_id(mint.x, mint.y))
                .filter(|id| board.display_url(*id).is_none())
                .collect()
        });
        self.board.update(|board| {
            for mint in &mints {
                board.mark_owned(tile_id(mint.x, mint.y));
            }
            for id in &fresh {
                board.mark_pending(*id);
            }
        });
        stream::iter(fresh)
            .for_each_concurrent(REPLAY_CONCURRENCY, |id| async move {
                let wallet = self.wallet.get_untracked();
                let art = resolve_token_image(&self.rpc, wallet.as_ref(), id).await;
                self.adopt_art(id, art.image_url).await;
            })
            .await;
    }

    /// A mint seen live: ownership lands immediately, artwork follows, and
    /// the status line announces the sale.
    async fn live_mint(&self, mint: MintedTile) {
        let id = tile_id(mint.x, mint.y);
        self.board.update(|board| {
            board.mark_owned(id);
            if board.display_url(id).is_none() {
                board.mark_pending(id);
            }
        });
        let wallet = self.wallet.get_untracked();
        let art = resolve_token_image(&self.rpc, wallet.as_ref(), id).await;
        let revealed = art.image_url.is_some();
        self.adopt_art(id, art.image_url).await;
        if revealed {
            self.status.success(format!(
                "Minted ({},{}) → {}",
                mint.x,
                mint.y,
                short_address(&mint.to)
            ));
        } else {
            self.status.info("Minted · image pending");
        }
    }

    /// Hydrate the connected wallet's own tiles from an indexer listing.
    /// Rows that already carry an image URL skip on-chain resolution.
    async fn wallet_inventory(&self, nfts: Vec<WalletNft>) {
        let ours: Vec<(u32, Option<String>)> = nfts
            .iter()
            .filter_map(|nft| Some((inventory_tile(nft)?, nft.image_url.clone())))
            .collect();
        if ours.is_empty() {
            return;
        }
        self.board.update(|board| {
            for (id, _) in &ours {
                board.mark_owned(*id);
                if board.display_url(*id).is_none() {
                    board.mark_pending(*id);
                }
            }
        });
        stream::iter(ours)
            .for_each_concurrent(REFRESH_CONCURRENCY, |(id, listed)| async move {
                match listed {
                    Some(raw) => self.adopt_art(id, Some(resolve_locator(&raw))).await,
                    None => {
                        let wallet = self.wallet.get_untracked();
                        let art = resolve_token_image(&self.rpc, wallet.as_ref(), id).await;
                        self.adopt_art(id, art.image_url).await;
                    }
                }
            })
            .await;
    }

    /// The user's own mint: owned on the spot, no artwork until the
    /// contract reveals it. The refresh pass picks it up from here.
    fn purchased(&self, x: u32, y: u32) {
        let id = tile_id(x, y);
        self.cache.set(id, None);
        self.board.update(|board| {
            board.mark_owned(id);
            board.mark_pending(id);
        });
    }

    /// Re-resolve every owned tile whose artwork has not settled: no image
    /// on screen yet, or a cached URL that is still a placeholder.
    async fn refresh_pending(&self) {
        let candidates: Vec<u32> = self.board.with_untracked(|board| {
            board
                .owned_ids()
                .filter(|id| board.needs_refresh(*id, self.cache.get(*id).as_deref()))
                .collect()
        });
        if candidates.is_empty() {
            return;
        }
        stream::iter(candidates)
            .for_each_concurrent(REFRESH_CONCURRENCY, |id| self.refresh_one(id))
            .await;
    }

    async fn refresh_one(&self, id: u32) {
        let wallet = self.wallet.get_untracked();
        let art = resolve_token_image(&self.rpc, wallet.as_ref(), id).await;
        let displayed = self
            .board
            .with_untracked(|board| board.display_url(id) == art.image_url.as_deref());
        match refresh_step(
            art.image_url.as_deref(),
            self.cache.get(id).as_deref(),
            displayed,
        ) {
            RefreshStep::Skip => {}
            RefreshStep::Adopt => {
                if let Some(source) = art.source {
                    console::log_1(&format!("tile {id} art settled via {}", source.tag()).into());
                }
                self.adopt_art(id, art.image_url).await;
            }
            RefreshStep::Reload => {
                if let Some(url) = art.image_url
                    && self.images.load(&url).await.is_some()
                {
                    self.board.update(|board| board.set_display(id, url));
                }
            }
        }
    }

    /// Persist a freshly resolved URL (or the lack of one) and advance the
    /// display once the image actually decodes. Ownership is untouched; a
    /// failed load leaves the tile on the sold marker for the next pass.
    async fn adopt_art(&self, id: u32, url: Option<String>) {
        self.cache.set(id, url.clone());
        let Some(url) = url else {
            self.board.update(|board| board.mark_pending(id));
            return;
        };
        if self.images.load(&url).await.is_some() {
            self.board.update(|board| board.set_display(id, url));
        } else {
            self.board.update(|board| board.mark_pending(id));
        }
    }
}

/// What a refresh attempt should do with a freshly resolved URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RefreshStep {
    /// Nothing usable resolved, or nothing changed.
    Skip,
    /// A genuinely new URL: persist it and load its image.
    Adopt,
    /// Same URL as cached but its image never made it to the screen;
    /// retry the load without touching the cache.
    Reload,
}

fn refresh_step(resolved: Option<&str>, cached: Option<&str>, displayed: bool) -> RefreshStep {
    let Some(url) = resolved else {
        return RefreshStep::Skip;
    };
    if is_placeholder_url(Some(url)) {
        return RefreshStep::Skip;
    }
    if cached != Some(url) {
        return RefreshStep::Adopt;
    }
    if displayed { RefreshStep::Skip } else { RefreshStep::Reload }
}

/// Map an indexer inventory row to a tile id, dropping rows for other
/// contracts and token ids past the board.
fn inventory_tile(nft: &WalletNft) -> Option<u32> {
    if !nft.contract.eq_ignore_ascii_case(CONTRACT_ADDRESS) {
        return None;
    }
    u32::try_from(nft.token_id)
        .ok()
        .filter(|id| *id < TILE_COUNT)
}

/// Walk the full block range for mint events, batching each chunk into the
/// engine queue. A chunk whose retries exhaust is logged and skipped so one
/// bad range cannot sink the whole replay.
pub async fn replay_history(rpc: RpcClient, handle: SyncHandle) {
    match rpc.block_number().await {
        Ok(latest) => {
            console::log_1(&format!("replaying mint logs through block {latest}").into());
            for (from, to) in block_chunks(0, latest, LOG_CHUNK_BLOCKS) {
                let filter = logs_filter(CONTRACT_ADDRESS, &[TOPIC_MINTED], from, to);
                match rpc.get_logs(filter).await {
                    Ok(logs) => {
                        let mints: Vec<MintedTile> =
                            logs.iter().filter_map(decode_mint).collect();
                        if !mints.is_empty() {
                            handle.send(SyncEvent::ReplayBatch(mints));
                        }
                    }
                    Err(err) => {
                        console::warn_1(
                            &format!("skipping mint logs {from}-{to}: {err}").into(),
                        );
                    }
                }
            }
        }
        Err(err) => {
            console::warn_1(&format!("mint history unavailable: {err}").into());
        }
    }
    handle.send(SyncEvent::ReplayDone);
}

/// Poll for mint logs past the last block seen, forever. The cursor starts
/// at the chain head; when the boot read fails it anchors on the first tick
/// that reaches the provider instead. Errors leave the cursor in place so
/// the next tick covers the gap.
pub async fn poll_live_mints(rpc: RpcClient, handle: SyncHandle) {
    let mut last_seen = match rpc.block_number().await {
        Ok(n) => Some(n),
        Err(err) => {
            console::warn_1(&format!("live mint feed not anchored yet: {err}").into());
            None
        }
    };
    loop {
        TimeoutFuture::new(LIVE_POLL_MS).await;
        let Ok(latest) = rpc.block_number().await else {
            continue;
        };
        let (from, to) = match poll_step(last_seen, latest) {
            PollStep::Anchor => {
                last_seen = Some(latest);
                continue;
            }
            PollStep::Idle => continue,
            PollStep::Fetch { from, to } => (from, to),
        };
        let filter = logs_filter(
            CONTRACT_ADDRESS,
            &[TOPIC_MINTED, TOPIC_TRANSFER, TOPIC_TRANSFER_SINGLE],
            from,
            to,
        );
        match rpc.get_logs(filter).await {
            Ok(logs) => {
                last_seen = Some(to);
                for mint in logs.iter().filter_map(decode_mint) {
                    handle.send(SyncEvent::LiveMint(mint));
                }
            }
            Err(err) => {
                console::warn_1(&format!("live mint poll failed: {err}").into());
            }
        }
    }
}

/// What one poll tick should do, given the cursor and the current head.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PollStep {
    /// No cursor yet; adopt the head and start watching from there.
    Anchor,
    /// Nothing past the cursor.
    Idle,
    /// New blocks to scan for mint logs.
    Fetch { from: u64, to: u64 },
}

fn poll_step(cursor: Option<u64>, latest: u64) -> PollStep {
    match cursor {
        None => PollStep::Anchor,
        Some(seen) if latest <= seen => PollStep::Idle,
        Some(seen) => PollStep::Fetch {
            from: seen + 1,
            to: latest,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_adopts_only_new_real_urls() {
        assert_eq!(refresh_step(None, None, false), RefreshStep::Skip);
        assert_eq!(
            refresh_step(Some("https://cdn.x/unrevealed.png"), None, false),
            RefreshStep::Skip
        );
        assert_eq!(
            refresh_step(Some("https://cdn.x/a.png"), None, false),
            RefreshStep::Adopt
        );
        assert_eq!(
            refresh_step(
                Some("https://cdn.x/b.png"),
                Some("https://cdn.x/a.png"),
                true
            ),
            RefreshStep::Adopt
        );
    }

    #[test]
    fn refresh_retries_load_for_cached_url_not_on_screen() {
        let url = Some("https://cdn.x/a.png");
        assert_eq!(refresh_step(url, url, false), RefreshStep::Reload);
        assert_eq!(refresh_step(url, url, true), RefreshStep::Skip);
    }

    #[test]
    fn inventory_rows_filter_to_this_contract_and_board() {
        let ours = WalletNft {
            token_id: 307,
            contract: CONTRACT_ADDRESS.to_uppercase(),
            image_url: None,
        };
        let foreign = WalletNft {
            token_id: 307,
            contract: "0x0000000000000000000000000000000000000001".into(),
            image_url: None,
        };
        let off_board = WalletNft {
            token_id: u64::from(TILE_COUNT),
            contract: CONTRACT_ADDRESS.into(),
            image_url: None,
        };
        assert_eq!(inventory_tile(&ours), Some(307));
        assert_eq!(inventory_tile(&foreign), None);
        assert_eq!(inventory_tile(&off_board), None);
    }

    #[test]
    fn live_poll_anchors_missing_cursor_instead_of_fetching() {
        // A feed whose boot read failed stays alive; its first reachable
        // tick adopts the head as the cursor.
        assert_eq!(poll_step(None, 900), PollStep::Anchor);
        assert_eq!(poll_step(Some(900), 900), PollStep::Idle);
        assert_eq!(poll_step(Some(900), 880), PollStep::Idle);
        assert_eq!(
            poll_step(Some(900), 903),
            PollStep::Fetch { from: 901, to: 903 }
        );
    }
}
