use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Static description of a dashboard widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    /// Config key toggling the widget. Several widgets may share one flag.
    pub visibility_flag: Option<&'static str>,
    /// Kept only so old layouts can be migrated.
    pub deprecated: bool,
    /// Polling interval used when the layout does not override it.
    pub default_refresh_secs: Option<u32>,
}

const fn widget(
    id: &'static str,
    label: &'static str,
    icon: &'static str,
    flag: &'static str,
    refresh: Option<u32>,
) -> WidgetInfo {
    WidgetInfo {
        id,
        label,
        icon,
        visibility_flag: Some(flag),
        deprecated: false,
        default_refresh_secs: refresh,
    }
}

const WIDGETS: &[WidgetInfo] = &[
    widget("clock", "Clock", "clock", "show_clock", None),
    widget("search", "Search", "search", "show_search", None),
    widget("status", "Status Overview", "activity", "show_status", Some(10)),
    widget("vitals", "System Vitals", "gauge", "show_vitals", Some(5)),
    widget("network", "Network", "wifi", "show_network", Some(5)),
    widget("disk", "Storage", "hard-drive", "show_disk", Some(30)),
    widget("alerts", "Alerts", "bell", "show_alerts", Some(30)),
    widget("favorites", "Favorites", "star", "show_favorites", None),
    widget("recent_apps", "Recent Apps", "history", "show_recent_apps", None),
    widget("my_apps", "My Apps", "layout-grid", "show_my_apps", Some(30)),
    widget("cpu_gauge", "CPU", "cpu", "show_gauges", Some(5)),
    widget("memory_gauge", "Memory", "memory-stick", "show_gauges", Some(5)),
    widget("disk_gauge", "Disk", "hard-drive", "show_gauges", Some(5)),
    widget("temp_gauge", "Temperature", "thermometer", "show_gauges", Some(5)),
    widget("uptime_load", "Uptime & Load", "timer", "show_uptime_load", Some(10)),
    widget(
        "network_throughput",
        "Network Throughput",
        "arrow-up-down",
        "show_network_throughput",
        Some(5),
    ),
    widget("swarm", "Swarm", "boxes", "show_swarm", Some(15)),
    widget("containers", "Containers", "container", "show_containers", Some(10)),
    widget("quick_actions", "Quick Actions", "zap", "show_quick_actions", None),
    WidgetInfo {
        id: "launcher",
        label: "App Launcher",
        icon: "rocket",
        visibility_flag: None,
        deprecated: true,
        default_refresh_secs: None,
    },
];

static GLOBAL: Lazy<WidgetRegistry> = Lazy::new(WidgetRegistry::with_defaults);

/// Lookup table of every known widget.
#[derive(Debug, Clone, Default)]
pub struct WidgetRegistry {
    map: HashMap<&'static str, WidgetInfo>,
    order: Vec<&'static str>,
}

impl WidgetRegistry {
    pub fn with_defaults() -> Self {
        let mut reg = Self::default();
        for info in WIDGETS {
            reg.register(*info);
        }
        reg
    }

    /// Shared registry of the built-in widgets.
    pub fn global() -> &'static WidgetRegistry {
        &GLOBAL
    }

    pub fn register(&mut self, info: WidgetInfo) {
        if self.map.insert(info.id, info).is_none() {
            self.order.push(info.id);
        }
    }

    pub fn get(&self, id: &str) -> Option<&WidgetInfo> {
        self.map.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.map.contains_key(id)
    }

    pub fn is_deprecated(&self, id: &str) -> bool {
        self.get(id).map(|w| w.deprecated).unwrap_or(false)
    }

    pub fn label<'a>(&self, id: &'a str) -> &'a str {
        match self.get(id) {
            Some(info) => info.label,
            None => id,
        }
    }

    /// Widgets in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &WidgetInfo> + '_ {
        self.order.iter().filter_map(|id| self.map.get(id))
    }

    /// Every distinct visibility flag, in registration order.
    pub fn visibility_flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        for info in self.iter() {
            if let Some(flag) = info.visibility_flag {
                if !flags.contains(&flag) {
                    flags.push(flag);
                }
            }
        }
        flags
    }

    /// Map an id (possibly in the old hyphenated spelling) to the registered id.
    pub fn canonical_id(&self, raw: &str) -> Option<&'static str> {
        if let Some(info) = self.get(raw) {
            return Some(info.id);
        }
        let underscored = raw.trim().replace('-', "_");
        self.get(&underscored).map(|info| info.id)
    }
}
