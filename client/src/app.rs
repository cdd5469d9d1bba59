use std::cell::RefCell;

use gloo_timers::future::TimeoutFuture;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen_futures::spawn_local;
use web_sys::console;

use baseland_shared::{format_eth, hex_to_u128, mint_price_call, short_address};

use crate::art_cache::ArtCache;
use crate::audio::AudioPlayer;
use crate::board::TileBoard;
use crate::canvas::BoardCanvas;
use crate::config::{CHAIN_NAME, CONTRACT_ADDRESS, REFRESH_INTERVAL_MS};
use crate::images::ImageStore;
use crate::indexer;
use crate::purchase;
use crate::rpc::RpcClient;
use crate::status::StatusBus;
use crate::sync::{self, SyncEvent};
use crate::viewport::Viewport;
use crate::wallet::{self, WalletSession};

/// Newtype wrappers so signals with the same inner type stay distinct in
/// Leptos context.
#[derive(Clone, Copy)]
pub(crate) struct Hovered(pub RwSignal<Option<(u32, u32)>>);
#[derive(Clone, Copy)]
pub(crate) struct Selected(pub RwSignal<Option<(u32, u32)>>);
#[derive(Clone, Copy)]
pub(crate) struct BuyOpen(pub RwSignal<bool>);
#[derive(Clone, Copy)]
pub(crate) struct AudioOn(pub RwSignal<bool>);

/// Shared ambient player; `None` when the element could not be created.
#[derive(Clone)]
pub(crate) struct AudioHandle(pub Option<AudioPlayer>);

struct VisibilityBinding {
    document: web_sys::Document,
    _handler: Closure<dyn Fn()>,
}

thread_local! {
    static VISIBILITY_BINDING: RefCell<Option<VisibilityBinding>> = const { RefCell::new(None) };
}

const HEADER_BUTTON_STYLE: &str = "background: #16181d; color: #FFFFFF; border: 1px solid #2a2e37; \
     border-radius: 8px; padding: 8px 14px; font-size: 13px; letter-spacing: 1px; cursor: pointer;";
const DIALOG_BUTTON_STYLE: &str = "background: #1652F0; color: #FFFFFF; border: none; \
     border-radius: 8px; padding: 10px 18px; font-size: 13px; letter-spacing: 1px; cursor: pointer;";
const DIALOG_CLOSE_STYLE: &str = "background: transparent; color: #9aa4b2; border: 1px solid #2a2e37; \
     border-radius: 8px; padding: 10px 18px; font-size: 13px; cursor: pointer;";

#[component]
pub fn App() -> impl IntoView {
    let board = RwSignal::new(TileBoard::default());
    let viewport = RwSignal::new(Viewport::default());
    let hovered = RwSignal::new(None::<(u32, u32)>);
    let selected = RwSignal::new(None::<(u32, u32)>);
    let buy_open = RwSignal::new(false);
    let wallet_session = RwSignal::new(None::<WalletSession>);
    let mint_price = RwSignal::new(None::<u128>);
    let connecting = RwSignal::new(false);
    let minting = RwSignal::new(false);
    let audio_on = RwSignal::new(AudioPlayer::stored_enabled());

    let status = StatusBus::new();
    let art_cache = ArtCache::load();
    let images = ImageStore::new();
    let rpc = RpcClient::new();
    let audio = AudioHandle(AudioPlayer::new().ok());

    let engine = sync::start(
        board,
        wallet_session,
        art_cache.clone(),
        images.clone(),
        rpc.clone(),
        status,
    );

    provide_context(board);
    provide_context(viewport);
    provide_context(Hovered(hovered));
    provide_context(Selected(selected));
    provide_context(BuyOpen(buy_open));
    provide_context(AudioOn(audio_on));
    // Rc-backed browser handles are not Send + Sync, which `provide_context`
    // requires; park them in local (same-thread) arena storage instead.
    provide_context(StoredValue::new_local(audio.clone()));
    provide_context(StoredValue::new_local(images.clone()));

    // Ownership persisted from the last visit shows before any RPC answers.
    engine.send(SyncEvent::Hydrate(art_cache.entries()));

    {
        let images = images.clone();
        spawn_local(async move { images.preload_marker().await });
    }

    // Replay the mint history, then read the price. The engine runs its
    // first reveal pass once the queued replay batches drain.
    {
        let rpc = rpc.clone();
        let engine = engine.clone();
        spawn_local(async move {
            sync::replay_history(rpc.clone(), engine).await;
            if let Some(price) = read_mint_price(&rpc).await {
                mint_price.set(Some(price));
            }
        });
    }

    spawn_local(sync::poll_live_mints(rpc.clone(), engine.clone()));

    {
        let engine = engine.clone();
        spawn_local(async move {
            loop {
                TimeoutFuture::new(REFRESH_INTERVAL_MS).await;
                engine.send(SyncEvent::RefreshTick);
            }
        });
    }

    if let Some(player) = audio.0.clone() {
        {
            let player = player.clone();
            spawn_local(async move { player.try_autoplay().await });
        }
        bind_visibility_resume(player, audio_on);
    }

    let on_connect = {
        let engine = engine.clone();
        let rpc = rpc.clone();
        move |_| {
            if connecting.get_untracked() || wallet_session.get_untracked().is_some() {
                return;
            }
            connecting.set(true);
            let engine = engine.clone();
            let rpc = rpc.clone();
            spawn_local(async move {
                match wallet::connect().await {
                    Ok(session) => match wallet::ensure_chain(&session) {
                        Ok(()) => {
                            let address = session.address.clone();
                            wallet_session.set(Some(session));
                            status.success(format!(
                                "Wallet: {} | Network: {CHAIN_NAME}",
                                short_address(&address)
                            ));
                            if let Some(price) = read_mint_price(&rpc).await {
                                mint_price.set(Some(price));
                            }
                            match indexer::nfts_for_address(&address).await {
                                Ok(nfts) => engine.send(SyncEvent::WalletInventory(nfts)),
                                Err(err) => console::warn_1(
                                    &format!("wallet inventory unavailable: {err}").into(),
                                ),
                            }
                        }
                        Err(err) => status.error(err),
                    },
                    Err(err) => status.error(err),
                }
                connecting.set(false);
            });
        }
    };

    let on_audio_toggle = {
        let audio = audio.clone();
        move |_| {
            let next = !audio_on.get_untracked();
            audio_on.set(next);
            if let Some(player) = audio.0.clone() {
                spawn_local(async move { player.set_enabled(next).await });
            }
        }
    };

    let on_buy_confirm = {
        let engine = engine.clone();
        move |_| {
            if minting.get_untracked() {
                return;
            }
            let Some((x, y)) = selected.get_untracked() else {
                return;
            };
            let Some(session) = wallet_session.get_untracked() else {
                status.error("Please connect your wallet first");
                return;
            };
            let Some(price) = mint_price.get_untracked() else {
                status.error("Mint price not loaded yet");
                return;
            };
            minting.set(true);
            status.info("Processing...");
            let engine = engine.clone();
            spawn_local(async move {
                match purchase::submit_mint(&session, x, y, price).await {
                    Ok(tx_hash) => {
                        engine.send(SyncEvent::Purchased { x, y });
                        buy_open.set(false);
                        status.success(format!("Mint successful! ({x},{y})"));
                        open_tab(&purchase::explorer_tx_url(&tx_hash));
                    }
                    Err(err) => status.error(err),
                }
                minting.set(false);
            });
        }
    };

    let wallet_label = move || match wallet_session.get() {
        Some(session) => short_address(&session.address),
        None if connecting.get() => "CONNECTING...".to_string(),
        None => "Connect Wallet".to_string(),
    };

    view! {
        <div style="position: fixed; inset: 0; background: #111111; color: #FFFFFF; font-family: 'Segoe UI', system-ui, sans-serif; overflow: hidden;">
            <BoardCanvas />
            <header style="position: absolute; top: 0; left: 0; right: 0; display: flex; align-items: center; justify-content: space-between; padding: 10px 16px; pointer-events: none;">
                <div style="font-size: 18px; font-weight: 700; letter-spacing: 3px; text-shadow: 0 1px 4px rgba(0,0,0,0.8);">
                    "BASELAND"
                </div>
                <div style="display: flex; gap: 8px; pointer-events: auto;">
                    <button style=HEADER_BUTTON_STYLE on:click=on_audio_toggle>
                        {move || if audio_on.get() { "🔊" } else { "🔈" }}
                    </button>
                    <button
                        style=HEADER_BUTTON_STYLE
                        prop:disabled=move || connecting.get()
                        on:click=on_connect
                    >
                        {wallet_label}
                    </button>
                </div>
            </header>
            <div style="position: absolute; left: 0; right: 0; bottom: 12px; display: flex; justify-content: center; pointer-events: none;">
                {move || {
                    status.0.get().map(|msg| {
                        view! {
                            <span
                                style="background: rgba(10,12,16,0.85); border: 1px solid #2a2e37; border-radius: 8px; padding: 6px 14px; font-size: 13px;"
                                style:color=msg.kind.color()
                            >
                                {msg.text}
                            </span>
                        }
                    })
                }}
            </div>
            {move || {
                if buy_open.get() {
                    let confirm = on_buy_confirm.clone();
                    view! {
                        <div style="position: absolute; inset: 0; display: flex; align-items: center; justify-content: center; background: rgba(0,0,0,0.6); z-index: 10;">
                            <div style="background: #16181d; border: 1px solid #2a2e37; border-radius: 10px; padding: 20px 24px; min-width: 260px; text-align: center;">
                                <div style="font-size: 13px; color: #9aa4b2; letter-spacing: 2px; margin-bottom: 6px;">
                                    "BUY TILE"
                                </div>
                                <div style="font-size: 22px; font-weight: 700; margin-bottom: 4px;">
                                    {move || {
                                        selected
                                            .get()
                                            .map(|(x, y)| format!("({x}, {y})"))
                                            .unwrap_or_default()
                                    }}
                                </div>
                                <div style="color: #9aa4b2; margin-bottom: 14px;">
                                    {move || {
                                        mint_price
                                            .get()
                                            .map(|p| format!("{} ETH", format_eth(p)))
                                            .unwrap_or_else(|| "…".to_string())
                                    }}
                                </div>
                                <div style="display: flex; gap: 8px; justify-content: center;">
                                    <button
                                        style=DIALOG_BUTTON_STYLE
                                        prop:disabled=move || minting.get()
                                        on:click=confirm
                                    >
                                        {move || if minting.get() { "PROCESSING..." } else { "Buy Now" }}
                                    </button>
                                    <button style=DIALOG_CLOSE_STYLE on:click=move |_| buy_open.set(false)>
                                        "Close"
                                    </button>
                                </div>
                            </div>
                        </div>
                    }
                        .into_any()
                } else {
                    ().into_any()
                }
            }}
        </div>
    }
}

async fn read_mint_price(rpc: &RpcClient) -> Option<u128> {
    let result = rpc
        .eth_call(CONTRACT_ADDRESS, &mint_price_call())
        .await
        .ok()?;
    hex_to_u128(&result)
}

fn open_tab(url: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.open_with_url_and_target(url, "_blank");
    }
}

/// Resume a paused track when the tab becomes visible again.
fn bind_visibility_resume(player: AudioPlayer, audio_on: RwSignal<bool>) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    VISIBILITY_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            let _ = old.document.remove_event_listener_with_callback(
                "visibilitychange",
                old._handler.as_ref().unchecked_ref(),
            );
        }
    });
    let cb = Closure::<dyn Fn()>::new(move || {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if document.hidden() || !audio_on.get_untracked() {
            return;
        }
        let player = player.clone();
        spawn_local(async move { player.try_autoplay().await });
    });
    if document
        .add_event_listener_with_callback("visibilitychange", cb.as_ref().unchecked_ref())
        .is_ok()
    {
        VISIBILITY_BINDING.with(|slot| {
            *slot.borrow_mut() = Some(VisibilityBinding {
                document: document.clone(),
                _handler: cb,
            });
        });
    }
}
