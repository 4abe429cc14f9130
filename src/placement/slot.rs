// src/placement/slot.rs

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::AdClient;
use crate::config::ClientConfig;
use crate::model::placement::{self, BannerSize, PlacementConfig};
use crate::model::AdCreative;
use crate::tracking::Tracker;

/// 当前页面会话中被用户关闭的广告，不持久化
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DismissedAdSet {
    ids: HashSet<String>,
}

impl DismissedAdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 重复关闭同一条广告不会新增记录
    pub fn insert(&mut self, ad_id: &str) -> bool {
        self.ids.insert(ad_id.to_string())
    }

    pub fn contains(&self, ad_id: &str) -> bool {
        self.ids.contains(ad_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SlotSettings {
    /// 关闭按钮出现前的等待时间
    pub close_delay: Duration,
}

impl From<&ClientConfig> for SlotSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            close_delay: config.close_delay,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotState {
    pub loading: bool,
    pub error: bool,
}

/// 共享给组件外部的挂载标记，卸载后 `load()` 不再写入状态
#[derive(Clone, Debug)]
pub struct SlotHandle {
    mounted: Arc<AtomicBool>,
}

impl SlotHandle {
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }
}

/// 某一时刻的渲染结果
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    pub position: String,
    pub container_class: String,
    pub size: BannerSize,
    pub sticky: bool,
    pub ads: Vec<AdCreative>,
    pub show_close: bool,
    pub error: bool,
}

/// **广告位实例**
/// 拉取 -> 提交列表 -> 上报曝光；关闭集合与广告列表只属于本实例。
pub struct AdSlot {
    config: PlacementConfig,
    category: Option<String>,
    client: Arc<AdClient>,
    tracker: Tracker,
    settings: SlotSettings,
    ads: Vec<AdCreative>,
    dismissed: DismissedAdSet,
    state: SlotState,
    rendered_at: Option<Instant>,
    mounted: Arc<AtomicBool>,
    pending: Vec<JoinHandle<()>>,
}

impl AdSlot {
    pub fn new(
        placement_name: &str,
        category: Option<&str>,
        client: Arc<AdClient>,
        tracker: Tracker,
        settings: SlotSettings,
    ) -> Self {
        Self {
            config: placement::resolve(placement_name),
            category: category.map(str::to_string),
            client,
            tracker,
            settings,
            ads: Vec::new(),
            dismissed: DismissedAdSet::new(),
            state: SlotState::default(),
            rendered_at: None,
            mounted: Arc::new(AtomicBool::new(true)),
            pending: Vec::new(),
        }
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    pub fn handle(&self) -> SlotHandle {
        SlotHandle {
            mounted: Arc::clone(&self.mounted),
        }
    }

    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn rendered_at(&self) -> Option<Instant> {
        self.rendered_at
    }

    /// **拉取并提交广告列表**
    /// 失败时渲染空广告位（保留容器），错误不向上传播。
    pub async fn load(&mut self) -> SlotState {
        if !self.is_mounted() {
            return self.state;
        }
        self.state.loading = true;

        let result = self
            .client
            .fetch_for_placement(&self.config, self.category.as_deref())
            .await;

        if !self.is_mounted() {
            debug!(position = %self.config.position, "slot unmounted during fetch, dropping result");
            return self.state;
        }

        match result {
            Ok(ads) => {
                info!(position = %self.config.position, count = ads.len(), "placement ads committed");
                self.ads = ads;
                self.state = SlotState { loading: false, error: false };
                self.rendered_at = Some(Instant::now());
                self.fire_impressions();
            }
            Err(e) => {
                warn!(
                    position = %self.config.position,
                    error_kind = e.kind(),
                    error = %e,
                    "ad fetch failed, rendering empty placement"
                );
                self.ads.clear();
                self.state = SlotState { loading: false, error: true };
                self.rendered_at = None;
            }
        }
        self.state
    }

    /// 每次拉取完成后，对本次提交的可见广告各上报一次曝光
    fn fire_impressions(&mut self) {
        let ids: Vec<String> = self.visible_ads().map(|ad| ad.id.clone()).collect();
        for id in ids {
            if let Some(handle) = self.tracker.track_impression(&id) {
                self.pending.push(handle);
            }
        }
    }

    pub fn fetched_len(&self) -> usize {
        self.ads.len()
    }

    pub fn visible_ads(&self) -> impl Iterator<Item = &AdCreative> {
        self.ads.iter().filter(|ad| !self.dismissed.contains(&ad.id))
    }

    pub fn dismissed(&self) -> &DismissedAdSet {
        &self.dismissed
    }

    /// 关闭广告，不可撤销，不触发重新拉取；返回是否为首次关闭
    pub fn dismiss(&mut self, ad_id: &str) -> bool {
        if !self.ads.iter().any(|ad| ad.id == ad_id) {
            return false;
        }
        self.dismissed.insert(ad_id)
    }

    pub fn can_close_at(&self, now: Instant) -> bool {
        self.rendered_at
            .map(|at| now.saturating_duration_since(at) >= self.settings.close_delay)
            .unwrap_or(false)
    }

    pub fn can_close(&self) -> bool {
        self.can_close_at(Instant::now())
    }

    /// **点击广告**
    /// 先发出点击上报（不等待），再返回落地页地址供跳转。
    pub fn click(&mut self, ad_id: &str) -> Option<String> {
        let link = self.visible_ads().find(|ad| ad.id == ad_id)?.link.clone();
        if let Some(handle) = self.tracker.track_click(ad_id) {
            self.pending.push(handle);
        }
        Some(link).filter(|l| !l.is_empty())
    }

    pub fn view_at(&self, now: Instant) -> SlotView {
        SlotView {
            position: self.config.position.clone(),
            container_class: self.config.container_class.clone(),
            size: self.config.size,
            sticky: self.config.sticky,
            ads: self.visible_ads().cloned().collect(),
            show_close: self.can_close_at(now),
            error: self.state.error,
        }
    }

    /// 等待尚未完成的上报任务
    pub async fn flush_tracking(&mut self) {
        for handle in self.pending.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "tracking task aborted");
            }
        }
    }
}
