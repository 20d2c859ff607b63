//! System container: the typed component graph plus attached time series.
//!
//! Components are keyed by `(component_type, name)`; names only need to be
//! unique within a type. Cross-references are stored as names, so the
//! container offers [`System::check_references`] to catch dangling bus
//! references after assembly or after a JSON load.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::components::{AnyComponent, Component, Generator};
use crate::error::{GctError, GctResult};
use crate::timeseries::SingleTimeSeries;

type ComponentKey = (String, String);
type SeriesKey = (String, String, String);

/// In-memory translated system.
#[derive(Debug, Clone)]
pub struct System {
    pub name: String,
    pub uuid: Uuid,
    components: BTreeMap<ComponentKey, AnyComponent>,
    time_series: BTreeMap<SeriesKey, SingleTimeSeries>,
}

impl System {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: Uuid::new_v4(),
            components: BTreeMap::new(),
            time_series: BTreeMap::new(),
        }
    }

    /// Add a component. Re-adding the same `(type, name)` key is an error;
    /// translation never silently overwrites.
    pub fn add_component(&mut self, component: impl Into<AnyComponent>) -> GctResult<()> {
        let component = component.into();
        let key = (
            component.component_type().to_string(),
            component.name().to_string(),
        );
        if self.components.contains_key(&key) {
            return Err(GctError::Consistency(format!(
                "duplicate component {} '{}'",
                key.0, key.1
            )));
        }
        self.components.insert(key, component);
        Ok(())
    }

    pub fn get(&self, component_type: &str, name: &str) -> Option<&AnyComponent> {
        self.components
            .get(&(component_type.to_string(), name.to_string()))
    }

    pub fn get_mut(&mut self, component_type: &str, name: &str) -> Option<&mut AnyComponent> {
        self.components
            .get_mut(&(component_type.to_string(), name.to_string()))
    }

    pub fn contains(&self, component_type: &str, name: &str) -> bool {
        self.get(component_type, name).is_some()
    }

    /// All components of one type, in name order.
    pub fn iter_type<'a>(
        &'a self,
        component_type: &'a str,
    ) -> impl Iterator<Item = &'a AnyComponent> + 'a {
        self.components
            .iter()
            .filter(move |((ty, _), _)| ty == component_type)
            .map(|(_, c)| c)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnyComponent> {
        self.components.values()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Typed view over generators, the most-queried component class.
    pub fn generators(&self) -> impl Iterator<Item = &Generator> {
        self.iter().filter_map(|c| match c {
            AnyComponent::Generator(g) => Some(g),
            _ => None,
        })
    }

    /// Remove a component along with its attached time series.
    pub fn remove(&mut self, component_type: &str, name: &str) -> GctResult<AnyComponent> {
        let key = (component_type.to_string(), name.to_string());
        let removed = self.components.remove(&key).ok_or_else(|| {
            GctError::Consistency(format!("cannot remove missing {component_type} '{name}'"))
        })?;
        self.time_series
            .retain(|(ty, n, _), _| !(ty == component_type && n == name));
        Ok(removed)
    }

    /// Duplicate a component under `new_name` with a fresh uuid. Attached
    /// time series are not copied; callers re-attach what the copy needs.
    pub fn copy_component(
        &mut self,
        component_type: &str,
        name: &str,
        new_name: &str,
    ) -> GctResult<()> {
        let mut copy = self
            .get(component_type, name)
            .ok_or_else(|| {
                GctError::Consistency(format!("cannot copy missing {component_type} '{name}'"))
            })?
            .clone();
        copy.reissue(new_name.to_string());
        self.add_component(copy)
    }

    /// Attach a series to a component. The `(component, variable_name)`
    /// pair must be unique and the component must already exist.
    pub fn add_time_series(
        &mut self,
        component_type: &str,
        name: &str,
        series: SingleTimeSeries,
    ) -> GctResult<()> {
        if !self.contains(component_type, name) {
            return Err(GctError::Consistency(format!(
                "cannot attach '{}' to missing {component_type} '{name}'",
                series.variable_name
            )));
        }
        let key = (
            component_type.to_string(),
            name.to_string(),
            series.variable_name.clone(),
        );
        if self.time_series.contains_key(&key) {
            return Err(GctError::Consistency(format!(
                "{component_type} '{name}' already has series '{}'",
                series.variable_name
            )));
        }
        self.time_series.insert(key, series);
        Ok(())
    }

    pub fn has_time_series(&self, component_type: &str, name: &str, variable_name: &str) -> bool {
        self.get_time_series(component_type, name, variable_name)
            .is_some()
    }

    pub fn get_time_series(
        &self,
        component_type: &str,
        name: &str,
        variable_name: &str,
    ) -> Option<&SingleTimeSeries> {
        self.time_series.get(&(
            component_type.to_string(),
            name.to_string(),
            variable_name.to_string(),
        ))
    }

    /// Variable names attached to one component.
    pub fn list_time_series<'a>(
        &'a self,
        component_type: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = &'a SingleTimeSeries> + 'a {
        self.time_series
            .iter()
            .filter(move |((ty, n, _), _)| ty == component_type && n == name)
            .map(|(_, s)| s)
    }

    /// Every attached series with its owning component key.
    pub fn all_time_series(
        &self,
    ) -> impl Iterator<Item = (&str, &str, &SingleTimeSeries)> {
        self.time_series
            .iter()
            .map(|((ty, name, _), s)| (ty.as_str(), name.as_str(), s))
    }

    /// Verify every bus name referenced by generators, loads, and branches
    /// resolves to an existing ACBus.
    pub fn check_references(&self) -> GctResult<()> {
        let mut dangling: Vec<String> = Vec::new();
        let mut check = |owner_type: &str, owner: &str, bus: &str| {
            if !self.contains("ACBus", bus) {
                dangling.push(format!("{owner_type} '{owner}' -> bus '{bus}'"));
            }
        };
        for component in self.iter() {
            match component {
                AnyComponent::Generator(g) => check("Generator", &g.name, &g.bus),
                AnyComponent::PowerLoad(l) => check("PowerLoad", &l.name, &l.bus),
                AnyComponent::MonitoredLine(l) => {
                    check("MonitoredLine", &l.name, &l.from_bus);
                    check("MonitoredLine", &l.name, &l.to_bus);
                }
                AnyComponent::Transformer2W(t) => {
                    check("Transformer2W", &t.name, &t.from_bus);
                    check("Transformer2W", &t.name, &t.to_bus);
                }
                AnyComponent::DCLine(d) => {
                    check("DCLine", &d.name, &d.from_bus);
                    check("DCLine", &d.name, &d.to_bus);
                }
                _ => {}
            }
        }
        if dangling.is_empty() {
            Ok(())
        } else {
            Err(GctError::Consistency(format!(
                "dangling bus references: {}",
                dangling.join(", ")
            )))
        }
    }

    /// Serialize the full system, components and series, as JSON.
    pub fn to_json<W: Write>(&self, writer: W) -> GctResult<()> {
        let doc = SystemDocument {
            name: self.name.clone(),
            uuid: self.uuid,
            components: self.components.values().cloned().collect(),
            time_series: self
                .time_series
                .iter()
                .map(|((ty, name, _), series)| SeriesEntry {
                    component_type: ty.clone(),
                    component_name: name.clone(),
                    series: series.clone(),
                })
                .collect(),
        };
        serde_json::to_writer_pretty(writer, &doc)?;
        Ok(())
    }

    /// Load a system from JSON, rebuilding the keyed maps and validating
    /// bus references.
    pub fn from_json<R: Read>(reader: R) -> GctResult<System> {
        let doc: SystemDocument = serde_json::from_reader(reader)?;
        let mut system = System::new(doc.name);
        system.uuid = doc.uuid;
        for component in doc.components {
            system.add_component(component)?;
        }
        for entry in doc.time_series {
            system.add_time_series(&entry.component_type, &entry.component_name, entry.series)?;
        }
        system.check_references()?;
        Ok(system)
    }
}

#[derive(Serialize, Deserialize)]
struct SystemDocument {
    name: String,
    uuid: Uuid,
    components: Vec<AnyComponent>,
    #[serde(default)]
    time_series: Vec<SeriesEntry>,
}

#[derive(Serialize, Deserialize)]
struct SeriesEntry {
    component_type: String,
    component_name: String,
    series: SingleTimeSeries,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ACBus, Area, Generator, GeneratorFamily, PowerLoad, PrimeMover};
    use crate::timeseries::SingleTimeSeries;

    fn small_system() -> System {
        let mut system = System::new("test");
        system.add_component(Area::new("west")).unwrap();
        system.add_component(ACBus::new(1, "node-1")).unwrap();
        system.add_component(ACBus::new(2, "node-2")).unwrap();
        system
            .add_component(Generator::new(
                "gas-1",
                "node-1",
                GeneratorFamily::Thermal,
                PrimeMover::CT,
            ))
            .unwrap();
        system
            .add_component(PowerLoad::new("load-2", "node-2"))
            .unwrap();
        system
    }

    #[test]
    fn test_duplicate_add_rejected() {
        let mut system = small_system();
        assert!(system.add_component(ACBus::new(3, "node-1")).is_err());
        // Same name under a different type is fine.
        assert!(system.add_component(Area::new("node-1")).is_ok());
    }

    #[test]
    fn test_iter_type() {
        let system = small_system();
        assert_eq!(system.iter_type("ACBus").count(), 2);
        assert_eq!(system.generators().count(), 1);
    }

    #[test]
    fn test_time_series_attachment() {
        let mut system = small_system();
        let ts = SingleTimeSeries::hourly_for_year("max_active_power", 2030, vec![1.0; 24]).unwrap();
        system
            .add_time_series("Generator", "gas-1", ts.clone())
            .unwrap();
        assert!(system.has_time_series("Generator", "gas-1", "max_active_power"));
        // Duplicate (component, variable) pair rejected.
        assert!(system.add_time_series("Generator", "gas-1", ts.clone()).is_err());
        // Missing component rejected.
        assert!(system.add_time_series("Generator", "nope", ts).is_err());
    }

    #[test]
    fn test_remove_drops_series() {
        let mut system = small_system();
        let ts = SingleTimeSeries::hourly_for_year("max_active_power", 2030, vec![1.0; 24]).unwrap();
        system.add_time_series("Generator", "gas-1", ts).unwrap();
        system.remove("Generator", "gas-1").unwrap();
        assert!(!system.has_time_series("Generator", "gas-1", "max_active_power"));
    }

    #[test]
    fn test_copy_component_reissues_identity() {
        let mut system = small_system();
        system.copy_component("Generator", "gas-1", "gas-1-copy").unwrap();
        let orig = system.get("Generator", "gas-1").unwrap();
        let copy = system.get("Generator", "gas-1-copy").unwrap();
        assert_ne!(orig.uuid(), copy.uuid());
        assert_eq!(copy.name(), "gas-1-copy");
    }

    #[test]
    fn test_dangling_reference_detected() {
        let mut system = System::new("bad");
        system
            .add_component(Generator::new(
                "g",
                "ghost-bus",
                GeneratorFamily::Thermal,
                PrimeMover::CT,
            ))
            .unwrap();
        assert!(system.check_references().is_err());
    }

    #[test]
    fn test_json_round_trip_preserves_identity() {
        let mut system = small_system();
        let ts = SingleTimeSeries::hourly_for_year("max_active_power", 2030, vec![0.5; 24]).unwrap();
        system.add_time_series("Generator", "gas-1", ts).unwrap();

        let mut buf = Vec::new();
        system.to_json(&mut buf).unwrap();
        let restored = System::from_json(buf.as_slice()).unwrap();

        assert_eq!(restored.len(), system.len());
        assert_eq!(restored.uuid, system.uuid);
        for component in system.iter() {
            let other = restored
                .get(component.component_type(), component.name())
                .unwrap();
            assert_eq!(other.uuid(), component.uuid());
        }
        assert!(restored.has_time_series("Generator", "gas-1", "max_active_power"));
    }
}
