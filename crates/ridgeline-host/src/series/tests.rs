//! Unit tests for the series bridge.

use serde_json::{Value, json};

use ridgeline_protocol::{ChartConfig, PluginInfo, SeriesConfig};

use super::*;
use crate::descriptor::HOST_API_VERSION;
use crate::form::DialogHost;
use crate::source::DataSource;

/// A source that always answers in one fixed layout, ignoring hints.
struct FixedLayoutSource {
    name: String,
    layout: StorageLayout,
    values: Vec<f64>,
}

impl FixedLayoutSource {
    fn interleaved(name: &str, values: &[f64]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            layout: StorageLayout::Interleaved,
            values: values.to_vec(),
        })
    }
}

impl DataSource for FixedLayoutSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> u32 {
        HOST_API_VERSION
    }

    fn patterns(&self) -> &[ridgeline_protocol::FilePattern] {
        &[]
    }

    fn info(&self) -> Result<PluginInfo, HostError> {
        Ok(PluginInfo::new(self.name.clone(), HOST_API_VERSION))
    }

    fn initialize(
        &self,
        _args: Option<&str>,
        _dialog: &mut dyn DialogHost,
    ) -> Result<Value, HostError> {
        Ok(json!({}))
    }

    fn chart_config(&self, _args: Option<&str>) -> Result<ChartConfig, HostError> {
        Ok(ChartConfig::default())
    }

    fn series_config(&self) -> Result<Vec<SeriesConfig>, HostError> {
        Ok(Vec::new())
    }

    fn series_data(
        &self,
        _series_id: &str,
        _preferred: Option<StorageLayout>,
    ) -> Result<BinaryFrame, HostError> {
        Ok(BinaryFrame::from_values(&self.values, self.layout))
    }

    fn close(&self) -> Result<(), HostError> {
        Ok(())
    }
}

fn bridge_with(sources: Vec<Arc<FixedLayoutSource>>) -> SeriesBridge {
    let manager = Arc::new(PluginManager::new());
    for source in sources {
        manager.register(source).expect("register");
    }
    SeriesBridge::new(manager)
}

#[test]
fn fetch_defaults_to_the_active_plugin() {
    let bridge = bridge_with(vec![
        FixedLayoutSource::interleaved("first", &[0.0, 10.0]),
        FixedLayoutSource::interleaved("second", &[9.0, 9.0]),
    ]);
    let frame = bridge.fetch(None, "s0", None).expect("fetch");
    assert_eq!(frame.values(), vec![0.0, 10.0]);
}

#[test]
fn fetch_can_target_a_named_plugin() {
    let bridge = bridge_with(vec![
        FixedLayoutSource::interleaved("first", &[0.0, 10.0]),
        FixedLayoutSource::interleaved("second", &[9.0, 9.0]),
    ]);
    let frame = bridge.fetch(Some("second"), "s0", None).expect("fetch");
    assert_eq!(frame.values(), vec![9.0, 9.0]);
}

#[test]
fn fetch_reports_the_layout_the_plugin_actually_used() {
    let bridge = bridge_with(vec![FixedLayoutSource::interleaved(
        "stubborn",
        &[0.0, 10.0, 1.0, 11.0],
    )]);
    // The hint asks for arrays; the plugin answers interleaved anyway.
    let frame = bridge
        .fetch(None, "s0", Some(StorageLayout::Arrays))
        .expect("fetch");
    assert_eq!(frame.storage(), StorageLayout::Interleaved);
}

#[test]
fn fetch_as_converts_when_the_hint_is_ignored() {
    let bridge = bridge_with(vec![FixedLayoutSource::interleaved(
        "stubborn",
        &[0.0, 10.0, 1.0, 11.0],
    )]);
    let frame = bridge
        .fetch_as(None, "s0", StorageLayout::Arrays)
        .expect("fetch");
    assert_eq!(frame.storage(), StorageLayout::Arrays);
    assert_eq!(frame.values(), vec![0.0, 1.0, 10.0, 11.0]);
}

#[test]
fn fetch_without_an_active_plugin_fails() {
    let bridge = SeriesBridge::new(Arc::new(PluginManager::new()));
    let err = bridge.fetch(None, "s0", None).expect_err("nothing active");
    assert!(matches!(err, HostError::NoActivePlugin));
}
