//! Relational pipeline: builds a System from an object/membership/property
//! source (PLEXOS-style).
//!
//! The caller runs the parameterized queries and hands over typed tuples;
//! this module owns model selection, build ordering, and the generator
//! construction algorithm. Build order matters: zones, buses, branches,
//! interfaces, and reserves exist before generators, and membership wiring
//! runs last so cross-references never hit a missing primary.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use polars::prelude::DataFrame;

use gct_config::{ModelConfig, RunConfig};
use gct_core::{
    ACBus, Diagnostics, Emission, EmissionType, GctError, GctResult, Generator, LoadZone, MinMax,
    MonitoredLine, OperatingCost, PowerLoad, Quantity, Reserve, ReserveMap, System,
    TransmissionInterface, TransmissionInterfaceMap, Unit,
};
use gct_resolve::{
    resolve_properties, PropertyRecord, ResolvedValue, ResolverContext, TableStore, VariableSpec,
};

use crate::frames::{column_f64, column_i64, column_utf8};
use crate::handler::{FileSpec, ParserData};

/// Object-table row: class, name, optional category.
#[derive(Debug, Clone)]
pub struct ObjectRow {
    pub class: String,
    pub name: String,
    pub category: Option<String>,
}

impl ObjectRow {
    pub fn new(class: &str, name: &str) -> Self {
        Self {
            class: class.to_string(),
            name: name.to_string(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }
}

/// Membership-table row linking a parent object to a child object through
/// a named collection.
#[derive(Debug, Clone)]
pub struct MembershipRow {
    pub parent_class: String,
    pub parent_name: String,
    pub child_class: String,
    pub child_name: String,
    pub collection: String,
}

impl MembershipRow {
    pub fn new(
        parent_class: &str,
        parent_name: &str,
        child_class: &str,
        child_name: &str,
        collection: &str,
    ) -> Self {
        Self {
            parent_class: parent_class.to_string(),
            parent_name: parent_name.to_string(),
            child_class: child_class.to_string(),
            child_name: child_name.to_string(),
            collection: collection.to_string(),
        }
    }
}

/// Everything queried out of the relational source before building.
pub struct RelationalSource {
    pub objects: Vec<ObjectRow>,
    pub memberships: Vec<MembershipRow>,
    pub properties: Vec<PropertyRecord>,
    /// Datafile object name -> path text.
    pub datafiles: BTreeMap<String, String>,
    /// Variable object name -> payload.
    pub variables: BTreeMap<String, VariableSpec>,
}

impl RelationalSource {
    /// Load a relational export laid out as CSV files in `folder`:
    /// `objects.csv`, `memberships.csv`, `properties.csv`, and optional
    /// `datafiles.csv` / `variables.csv`.
    pub fn load(folder: &Path, diag: &mut Diagnostics) -> GctResult<Self> {
        let specs = [
            FileSpec::mandatory("objects", "objects.csv"),
            FileSpec::mandatory("memberships", "memberships.csv"),
            FileSpec::mandatory("properties", "properties.csv"),
            FileSpec::optional("datafiles", "datafiles.csv"),
            FileSpec::optional("variables", "variables.csv"),
        ];
        let data = ParserData::load(folder, &specs, diag)?;

        let mut objects = Vec::new();
        {
            let df = data.require("objects")?;
            let classes = column_utf8(df, "class")?;
            let names = column_utf8(df, "name")?;
            let categories = column_utf8(df, "category")?;
            for ((class, name), category) in classes.iter().zip(&names).zip(&categories) {
                let (Some(class), Some(name)) = (class, name) else {
                    diag.add_warning("input", "object row without class or name, skipped");
                    continue;
                };
                let mut object = ObjectRow::new(class, name);
                object.category = category.clone();
                objects.push(object);
            }
        }

        let mut memberships = Vec::new();
        {
            let df = data.require("memberships")?;
            let parent_classes = column_utf8(df, "parent_class")?;
            let parent_names = column_utf8(df, "parent_name")?;
            let child_classes = column_utf8(df, "child_class")?;
            let child_names = column_utf8(df, "child_name")?;
            let collections = column_utf8(df, "collection")?;
            for i in 0..df.height() {
                let all = (
                    parent_classes[i].as_deref(),
                    parent_names[i].as_deref(),
                    child_classes[i].as_deref(),
                    child_names[i].as_deref(),
                    collections[i].as_deref(),
                );
                let (Some(pc), Some(pn), Some(cc), Some(cn), Some(col)) = all else {
                    diag.add_warning("input", "membership row with missing fields, skipped");
                    continue;
                };
                memberships.push(MembershipRow::new(pc, pn, cc, cn, col));
            }
        }

        let properties = {
            let df = data.require("properties")?;
            property_records(df, diag)?
        };

        let mut datafiles = BTreeMap::new();
        if let Some(df) = data.get("datafiles") {
            let names = column_utf8(df, "name")?;
            let paths = column_utf8(df, "path")?;
            for (name, path) in names.iter().zip(&paths) {
                if let (Some(name), Some(path)) = (name, path) {
                    datafiles.insert(name.clone(), path.clone());
                }
            }
        }

        let mut variables = BTreeMap::new();
        if let Some(df) = data.get("variables") {
            let names = column_utf8(df, "name")?;
            let values = column_f64(df, "value")?;
            let paths = column_utf8(df, "data_file")?;
            for ((name, value), path) in names.iter().zip(&values).zip(&paths) {
                if let Some(name) = name {
                    variables.insert(
                        name.clone(),
                        VariableSpec {
                            value: *value,
                            data_file: path.clone(),
                        },
                    );
                }
            }
        }

        Ok(Self {
            objects,
            memberships,
            properties,
            datafiles,
            variables,
        })
    }
}

/// Property rows from the relational export's flat CSV shape.
fn property_records(df: &DataFrame, diag: &mut Diagnostics) -> GctResult<Vec<PropertyRecord>> {
    let objects = column_utf8(df, "object_name")?;
    let names = column_utf8(df, "property_name")?;
    let values = column_f64(df, "value")?;
    let units = optional_utf8(df, "unit")?;
    let bands = optional_i64(df, "band")?;
    let date_froms = optional_utf8(df, "date_from")?;
    let date_tos = optional_utf8(df, "date_to")?;
    let scenarios = optional_utf8(df, "scenario")?;
    let actions = optional_utf8(df, "action")?;
    let data_file_tags = optional_utf8(df, "data_file_tag")?;
    let data_files = optional_utf8(df, "data_file")?;
    let variable_tags = optional_utf8(df, "variable_tag")?;
    let timeslices = optional_utf8(df, "timeslice")?;

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let (Some(object_name), Some(property_name)) =
            (objects[i].as_deref(), names[i].as_deref())
        else {
            diag.add_warning("input", "property row without object or name, skipped");
            continue;
        };
        records.push(PropertyRecord {
            object_name: object_name.to_string(),
            property_name: property_name.to_string(),
            value: values[i],
            unit: cell(&units, i),
            band: bands.as_ref().map(|b| b[i]).unwrap_or(None),
            date_from: parse_date(cell(&date_froms, i).as_deref()),
            date_to: parse_date(cell(&date_tos, i).as_deref()),
            scenario: cell(&scenarios, i),
            action: cell(&actions, i).and_then(|a| a.chars().next()),
            data_file_tag: cell(&data_file_tags, i),
            data_file: cell(&data_files, i),
            variable_tag: cell(&variable_tags, i),
            timeslice: cell(&timeslices, i),
        });
    }
    Ok(records)
}

fn optional_utf8(df: &DataFrame, name: &str) -> GctResult<Option<Vec<Option<String>>>> {
    if df.get_column_names().contains(&name) {
        Ok(Some(column_utf8(df, name)?))
    } else {
        Ok(None)
    }
}

fn optional_i64(df: &DataFrame, name: &str) -> GctResult<Option<Vec<Option<i64>>>> {
    if df.get_column_names().contains(&name) {
        Ok(Some(column_i64(df, name)?))
    } else {
        Ok(None)
    }
}

fn cell(column: &Option<Vec<Option<String>>>, i: usize) -> Option<String> {
    column.as_ref().and_then(|c| c[i].clone())
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
}

pub struct RelationalParser<'a> {
    source: RelationalSource,
    config: &'a ModelConfig,
    run: &'a RunConfig,
    store: &'a dyn TableStore,
    diag: Diagnostics,
}

impl<'a> RelationalParser<'a> {
    pub fn new(
        source: RelationalSource,
        config: &'a ModelConfig,
        run: &'a RunConfig,
        store: &'a dyn TableStore,
    ) -> Self {
        Self {
            source,
            config,
            run,
            store,
            diag: Diagnostics::new(),
        }
    }

    /// Build the System. Configuration problems are fatal; per-object
    /// problems are collected in the returned diagnostics.
    pub fn build(mut self) -> GctResult<(System, Diagnostics)> {
        let active_scenarios = self.select_model()?;
        let mut ctx = ResolverContext::new(self.store, self.run.study_year);
        ctx.datafiles = self.source.datafiles.clone();
        ctx.variables = self.source.variables.clone();
        ctx.active_scenarios = active_scenarios;

        let mut system = System::new(&self.run.name);
        self.build_zones(&mut system)?;
        self.build_buses(&mut system, &ctx)?;
        self.build_lines(&mut system, &ctx)?;
        self.build_interfaces(&mut system, &ctx)?;
        self.build_reserves(&mut system, &ctx)?;
        self.build_generators(&mut system, &ctx)?;
        self.wire_memberships(&mut system)?;
        self.build_loads(&mut system, &ctx)?;
        Ok((system, self.diag))
    }

    /// Model selection: when the source carries Model objects, the run's
    /// scenario key must name exactly one of them; its Scenario children
    /// become the active scenarios (configured ones first).
    fn select_model(&self) -> GctResult<Vec<String>> {
        let models: Vec<&ObjectRow> = self.objects_of("Model");
        let mut active = self.run.active_scenarios.clone();
        if models.is_empty() {
            return Ok(active);
        }
        let wanted = self.run.scenario.as_deref().ok_or_else(|| {
            GctError::Config(format!(
                "source has {} models but no model was selected",
                models.len()
            ))
        })?;
        let matching: Vec<&&ObjectRow> = models.iter().filter(|m| m.name == wanted).collect();
        match matching.len() {
            0 => Err(GctError::Config(format!("model '{wanted}' not found"))),
            1 => {
                for m in &self.source.memberships {
                    if m.parent_class == "Model"
                        && m.parent_name == wanted
                        && m.child_class == "Scenario"
                        && !active.contains(&m.child_name)
                    {
                        active.push(m.child_name.clone());
                    }
                }
                Ok(active)
            }
            n => Err(GctError::Config(format!(
                "model '{wanted}' is ambiguous: {n} objects carry that name"
            ))),
        }
    }

    fn objects_of(&self, class: &str) -> Vec<&ObjectRow> {
        self.source
            .objects
            .iter()
            .filter(|o| o.class == class)
            .collect()
    }

    /// Children of one parent through a collection.
    fn children_of(&self, parent_class: &str, parent_name: &str, collection: &str) -> Vec<String> {
        self.source
            .memberships
            .iter()
            .filter(|m| {
                m.parent_class == parent_class
                    && m.parent_name == parent_name
                    && m.collection == collection
            })
            .map(|m| m.child_name.clone())
            .collect()
    }

    fn resolve(
        &mut self,
        object_name: &str,
        ctx: &ResolverContext,
    ) -> GctResult<gct_resolve::ResolvedProperties> {
        resolve_properties(
            &self.source.properties,
            object_name,
            ctx,
            self.config,
            &mut self.diag,
        )
    }

    fn build_zones(&mut self, system: &mut System) -> GctResult<()> {
        for region in self.objects_of("Region").into_iter().cloned().collect::<Vec<_>>() {
            let mut zone = LoadZone::new(&region.name);
            zone.category = region.category.clone();
            system.add_component(zone)?;
        }
        Ok(())
    }

    fn build_buses(&mut self, system: &mut System, ctx: &ResolverContext) -> GctResult<()> {
        let nodes: Vec<ObjectRow> = self.objects_of("Node").into_iter().cloned().collect();
        for (i, node) in nodes.iter().enumerate() {
            let props = self.resolve(&node.name, ctx)?;
            let mut bus = ACBus::new(i as u64 + 1, &node.name);
            bus.category = node.category.clone();
            if let Some(kv) = props.scalar("Voltage") {
                bus.base_voltage = Some(Quantity::new(kv, Unit::Kilovolt)?);
            }
            let regions = self.children_of("Node", &node.name, "Region");
            if let Some(region) = regions.first() {
                if system.contains("LoadZone", region) {
                    bus.load_zone = Some(region.to_string());
                } else {
                    self.diag.add_warning_with_entity(
                        "parser",
                        format!("region '{region}' not found, bus left unzoned"),
                        &node.name,
                    );
                }
            }
            system.add_component(bus)?;
        }
        Ok(())
    }

    fn build_lines(&mut self, system: &mut System, ctx: &ResolverContext) -> GctResult<()> {
        let lines: Vec<ObjectRow> = self.objects_of("Line").into_iter().cloned().collect();
        for line in lines {
            let from = self.children_of("Line", &line.name, "Node From");
            let to = self.children_of("Line", &line.name, "Node To");
            let (Some(from), Some(to)) = (from.first(), to.first()) else {
                self.diag.add_warning_with_entity(
                    "parser",
                    "line lacks a from/to node membership, skipped",
                    &line.name,
                );
                continue;
            };
            if !system.contains("ACBus", from) || !system.contains("ACBus", to) {
                self.diag.add_warning_with_entity(
                    "parser",
                    format!("line endpoints '{from}'/'{to}' missing, skipped"),
                    &line.name,
                );
                continue;
            }
            let (from, to) = (from.to_string(), to.to_string());
            let props = self.resolve(&line.name, ctx)?;
            let mut built = MonitoredLine::new(&line.name, from, to);
            built.category = line.category.clone();
            if let Some(limit) = props.scalar("Max Flow") {
                built.rating_up = Some(Quantity::new(limit, Unit::Megawatt)?);
            }
            if let Some(limit) = props.scalar("Min Flow") {
                built.rating_down = Some(Quantity::new(limit.abs(), Unit::Megawatt)?);
            }
            built.resistance = props.scalar("Resistance");
            built.reactance = props.scalar("Reactance");
            built.losses = props.scalar("Loss Incr");
            system.add_component(built)?;
        }
        Ok(())
    }

    fn build_interfaces(&mut self, system: &mut System, ctx: &ResolverContext) -> GctResult<()> {
        let interfaces: Vec<ObjectRow> = self.objects_of("Interface").into_iter().cloned().collect();
        if interfaces.is_empty() {
            return Ok(());
        }
        let mut map = TransmissionInterfaceMap::new("transmission_interfaces");
        for interface in interfaces {
            let props = self.resolve(&interface.name, ctx)?;
            // Flow limits are required; unbounded interfaces are never kept.
            let max = props.scalar("Max Flow");
            let min = props.scalar("Min Flow");
            let (Some(max), Some(min)) = (max, min) else {
                let mut missing: Vec<&str> = Vec::new();
                if max.is_none() {
                    missing.push("Max Flow");
                }
                if min.is_none() {
                    missing.push("Min Flow");
                }
                self.diag.add_warning_with_entity(
                    "parser",
                    format!(
                        "missing required fields [{}], interface skipped",
                        missing.join(", ")
                    ),
                    &interface.name,
                );
                continue;
            };
            let limits = MinMax::new(min.min(max), max.max(min))?;
            let mut built = TransmissionInterface::new(&interface.name, limits);
            built.category = interface.category.clone();
            system.add_component(built)?;

            for line in self.children_of("Interface", &interface.name, "Lines") {
                if system.contains("MonitoredLine", &line) {
                    map.add_member(&interface.name, &line);
                } else {
                    self.diag.add_warning_with_entity(
                        "parser",
                        format!("member line '{line}' missing, relation skipped"),
                        &interface.name,
                    );
                }
            }
        }
        system.add_component(map)?;
        Ok(())
    }

    fn build_reserves(&mut self, system: &mut System, ctx: &ResolverContext) -> GctResult<()> {
        let reserves: Vec<ObjectRow> = self.objects_of("Reserve").into_iter().cloned().collect();
        for reserve in reserves {
            let type_code = reserve.category.as_deref().unwrap_or(&reserve.name);
            let Some(spec) = self.config.reserve_spec(type_code) else {
                self.diag.add_warning_with_entity(
                    "parser",
                    format!("unmapped reserve type '{type_code}', skipped"),
                    &reserve.name,
                );
                continue;
            };
            let props = self.resolve(&reserve.name, ctx)?;
            let mut built = Reserve::new(&reserve.name, spec.reserve_type, spec.direction);
            built.category = reserve.category.clone();
            built.time_frame = props.scalar("Timeframe");
            built.duration = props.scalar("Duration");
            built.vors = props.scalar("VoRS");
            if let Some(req) = props.scalar("Min Provision") {
                built.max_requirement = Some(Quantity::new(req, Unit::Megawatt)?);
            }
            system.add_component(built)?;
        }
        Ok(())
    }

    /// The generator construction algorithm. Steps: resolve the device's
    /// technology through the override chain, classify it into a family,
    /// derive capacity from max-capacity/rating/rating-factor/units,
    /// shape the cost object by family, validate required fields, attach
    /// series, then leave membership wiring to the post pass.
    fn build_generators(&mut self, system: &mut System, ctx: &ResolverContext) -> GctResult<()> {
        let devices: Vec<ObjectRow> = self
            .objects_of("Generator")
            .into_iter()
            .chain(self.objects_of("Battery"))
            .cloned()
            .collect();
        for device in devices {
            let props = self.resolve(&device.name, ctx)?;
            if let Some(generator) = self.build_one_generator(&device, &props)? {
                let name = generator.name.clone();
                system.add_component(generator)?;
                // Attach series-valued properties under their own names.
                for (prop_name, value) in &props.values {
                    if let ResolvedValue::Series(series) = value {
                        if let Err(e) =
                            system.add_time_series("Generator", &name, series.clone())
                        {
                            self.diag.add_warning_with_entity(
                                "parser",
                                format!("series '{prop_name}' not attached: {e}"),
                                &name,
                            );
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn build_one_generator(
        &mut self,
        device: &ObjectRow,
        props: &gct_resolve::ResolvedProperties,
    ) -> GctResult<Option<Generator>> {
        let fuel_names = self.children_of(&device.class, &device.name, "Fuels");
        let fuel_name = fuel_names.first().map(|s| s.to_string());

        // Type chain: device name, category, fuel name, substring inference.
        let Some(tech) = self.config.resolve_tech(
            &device.name,
            device.category.as_deref(),
            fuel_name.as_deref(),
        ) else {
            self.diag.add_warning_with_entity(
                "parser",
                "no technology mapping matched, device skipped",
                &device.name,
            );
            return Ok(None);
        };
        let Some(family) = self.config.classify(tech.fuel, tech.prime_mover) else {
            self.diag.add_warning_with_entity(
                "parser",
                format!(
                    "no rule maps fuel {:?} prime mover {} to a family, device skipped",
                    tech.fuel, tech.prime_mover
                ),
                &device.name,
            );
            return Ok(None);
        };

        // Units: 0 marks the device permanently unavailable.
        let units = props.scalar("Units").unwrap_or(1.0);
        if units == 0.0 {
            self.diag.add_warning_with_entity(
                "parser",
                "units is 0, device skipped as unavailable",
                &device.name,
            );
            return Ok(None);
        }

        // Capacity: max capacity, overridden by rating (series take their
        // maximum), scaled by rating factor, multiplied by unit count.
        let mut capacity = props.scalar("Max Capacity");
        if let Some(rating) = props.get("Rating") {
            capacity = Some(rating.magnitude_or_max());
        }
        if let Some(factor) = props.get("Rating Factor") {
            if let Some(cap) = capacity {
                capacity = Some(cap * factor.magnitude_or_max() / 100.0);
            }
        }
        let capacity = capacity.map(|c| c * units);

        let buses = self.children_of(&device.class, &device.name, "Nodes");
        let bus = buses.first().map(|s| s.to_string());

        // Required fields per family; partial construction is never kept.
        let mut missing: Vec<&str> = Vec::new();
        if bus.is_none() {
            missing.push("bus");
        }
        if capacity.is_none() {
            missing.push("base_power");
        }
        if device.class == "Battery" && props.scalar("Capacity").is_none() {
            missing.push("storage_capacity");
        }
        if !missing.is_empty() {
            self.diag.add_warning_with_entity(
                "parser",
                format!("missing required fields [{}], device skipped", missing.join(", ")),
                &device.name,
            );
            return Ok(None);
        }
        let bus = bus.unwrap_or_default();
        let capacity = capacity.unwrap_or_default();

        let family = if device.class == "Battery" {
            gct_core::GeneratorFamily::Storage
        } else {
            family
        };
        let mut generator = Generator::new(&device.name, bus, family, tech.prime_mover)
            .with_base_power(Quantity::new(capacity, Unit::Megawatt)?);
        generator.category = device.category.clone();
        generator.fuel = tech.fuel;
        if let Some(min) = props.scalar("Min Stable Level") {
            generator.active_power_limits = Some(MinMax::new(min.min(capacity), capacity)?);
        }
        generator.ramp_up = match props.scalar("Max Ramp Up") {
            Some(r) => Some(Quantity::new(r * units, Unit::MegawattPerMinute)?),
            None => None,
        };
        generator.ramp_down = match props.scalar("Max Ramp Down") {
            Some(r) => Some(Quantity::new(r * units, Unit::MegawattPerMinute)?),
            None => None,
        };
        generator.min_up_time = props.scalar("Min Up Time");
        generator.min_down_time = props.scalar("Min Down Time");
        generator.forced_outage_rate = props.scalar("Forced Outage Rate").map(|v| v / 100.0);
        generator.planned_outage_rate = props.scalar("Maintenance Rate").map(|v| v / 100.0);

        generator.operating_cost = match family {
            gct_core::GeneratorFamily::Thermal => OperatingCost::Thermal {
                heat_rate: scalar_quantity(props, "Heat Rate", Unit::MillionBtuPerMegawattHour)?,
                fuel_price: scalar_quantity(props, "Fuel Price", Unit::UsdPerMillionBtu)?,
                vom_price: scalar_quantity(props, "VO&M Charge", Unit::UsdPerMegawattHour)?,
                start_up_cost: scalar_quantity(props, "Start Cost", Unit::Usd)?,
            },
            gct_core::GeneratorFamily::Hydro | gct_core::GeneratorFamily::HydroPumped => {
                OperatingCost::Hydro {
                    vom_price: scalar_quantity(props, "VO&M Charge", Unit::UsdPerMegawattHour)?,
                }
            }
            gct_core::GeneratorFamily::RenewableDispatch
            | gct_core::GeneratorFamily::RenewableNonDispatch => OperatingCost::Renewable {
                curtailment_cost: scalar_quantity(props, "Curtailment Cost", Unit::UsdPerMegawattHour)?,
            },
            gct_core::GeneratorFamily::Storage => OperatingCost::Storage {
                charge_cost: scalar_quantity(props, "Charge Cost", Unit::UsdPerMegawattHour)?,
                discharge_cost: scalar_quantity(props, "Discharge Cost", Unit::UsdPerMegawattHour)?,
            },
        };

        if family == gct_core::GeneratorFamily::Storage
            || family == gct_core::GeneratorFamily::HydroPumped
        {
            if let Some(energy) = props.scalar("Capacity") {
                generator.storage_capacity =
                    Some(Quantity::new(energy * units, Unit::MegawattHour)?);
            }
            generator.charge_efficiency = props.scalar("Charge Efficiency").map(|v| v / 100.0);
            generator.discharge_efficiency =
                props.scalar("Discharge Efficiency").map(|v| v / 100.0);
        }

        if !props.multi_band.is_empty() {
            self.diag.add_warning_with_entity(
                "parser",
                format!("multi-band properties left uncombined: {:?}", props.multi_band),
                &device.name,
            );
        }

        if let Err(e) = generator.validate() {
            self.diag
                .add_warning_with_entity("parser", format!("invalid device skipped: {e}"), &device.name);
            return Ok(None);
        }
        Ok(Some(generator))
    }

    /// Post pass wiring reserves and emissions to generators by
    /// membership; a missing target skips the relation, never the owner.
    fn wire_memberships(&mut self, system: &mut System) -> GctResult<()> {
        let mut reserve_map = ReserveMap::new("reserve_membership");
        let mut emissions: Vec<Emission> = Vec::new();
        let memberships = self.source.memberships.clone();
        for m in &memberships {
            match (m.parent_class.as_str(), m.collection.as_str()) {
                ("Reserve", "Generators") => {
                    if !system.contains("Reserve", &m.parent_name) {
                        self.diag.add_warning_with_entity(
                            "parser",
                            format!("reserve '{}' missing, relation skipped", m.parent_name),
                            &m.child_name,
                        );
                        continue;
                    }
                    if !system.contains("Generator", &m.child_name) {
                        self.diag.add_warning_with_entity(
                            "parser",
                            format!("generator '{}' missing, relation skipped", m.child_name),
                            &m.parent_name,
                        );
                        continue;
                    }
                    reserve_map.add_member(&m.parent_name, &m.child_name);
                }
                ("Emission", "Generators") => {
                    if !system.contains("Generator", &m.child_name) {
                        self.diag.add_warning_with_entity(
                            "parser",
                            format!("generator '{}' missing, emission skipped", m.child_name),
                            &m.parent_name,
                        );
                        continue;
                    }
                    let Some(emission_type) = EmissionType::from_source(&m.parent_name) else {
                        self.diag.add_warning_with_entity(
                            "parser",
                            "unrecognized emission type, relation skipped",
                            &m.parent_name,
                        );
                        continue;
                    };
                    let rate = self
                        .source
                        .properties
                        .iter()
                        .find(|p| p.object_name == m.child_name && p.property_name == "Production Rate")
                        .and_then(|p| p.value)
                        .unwrap_or(0.0);
                    emissions.push(Emission::new(
                        &m.child_name,
                        emission_type,
                        Quantity::new(rate, Unit::KilogramPerMegawattHour)?,
                    ));
                }
                _ => {}
            }
        }
        if !reserve_map.mapping.is_empty() {
            system.add_component(reserve_map)?;
        }
        for emission in emissions {
            system.add_component(emission)?;
        }
        Ok(())
    }

    /// One load per zone, with the hourly shape attached when the zone
    /// carries a load-profile property.
    fn build_loads(&mut self, system: &mut System, ctx: &ResolverContext) -> GctResult<()> {
        let regions: Vec<ObjectRow> = self.objects_of("Region").into_iter().cloned().collect();
        for region in regions {
            let bus = system
                .iter_type("ACBus")
                .find(|b| match b {
                    gct_core::AnyComponent::ACBus(bus) => {
                        bus.load_zone.as_deref() == Some(region.name.as_str())
                    }
                    _ => false,
                })
                .map(|b| b.name().to_string());
            let Some(bus) = bus else {
                self.diag.add_warning_with_entity(
                    "parser",
                    "region has no bus, load skipped",
                    &region.name,
                );
                continue;
            };
            let props = self.resolve(&region.name, ctx)?;
            let Some(load_value) = props.get("Load") else {
                continue;
            };
            let name = format!("{}_load", region.name);
            let mut load = PowerLoad::new(&name, &bus);
            load.max_active_power = Some(Quantity::new(
                load_value.magnitude_or_max(),
                Unit::Megawatt,
            )?);
            system.add_component(load)?;
            if let ResolvedValue::Series(series) = load_value {
                let mut series = series.clone();
                series.variable_name = "max_active_power".to_string();
                system.add_time_series("PowerLoad", &name, series)?;
            }
        }
        Ok(())
    }
}

fn scalar_quantity(
    props: &gct_resolve::ResolvedProperties,
    name: &str,
    unit: Unit,
) -> GctResult<Option<Quantity>> {
    match props.get(name) {
        Some(ResolvedValue::Scalar(q)) => Ok(Some(q.convert_to(unit)?)),
        Some(ResolvedValue::Raw(v)) => Ok(Some(Quantity::new(*v, unit)?)),
        Some(ResolvedValue::Series(ts)) => Ok(Some(Quantity::new(ts.mean(), unit)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gct_core::{AnyComponent, Fuel, GeneratorFamily, PrimeMover};
    use gct_config::{TechDescriptor, TechRule};
    use gct_resolve::MemoryTableStore;

    fn run_config() -> RunConfig {
        RunConfig {
            name: "relational_test".to_string(),
            study_year: 2030,
            weather_year: None,
            scenario: None,
            active_scenarios: Vec::new(),
            run_folder: "/tmp".into(),
            output_folder: "/tmp".into(),
            time_series_fname: gct_config::DEFAULT_TS_FNAME.to_string(),
        }
    }

    fn model_config() -> ModelConfig {
        let mut config = ModelConfig::default();
        config.device_name_inference_map.insert(
            "gas".to_string(),
            TechDescriptor {
                fuel: Some(Fuel::NaturalGas),
                prime_mover: PrimeMover::CT,
            },
        );
        config.tech_rule_table.push(TechRule {
            fuel: Some(Fuel::NaturalGas),
            prime_mover: None,
            family: GeneratorFamily::Thermal,
        });
        config
    }

    fn base_source() -> RelationalSource {
        let objects = vec![
            ObjectRow::new("Region", "north"),
            ObjectRow::new("Node", "bus1").with_category("north"),
            ObjectRow::new("Generator", "gas_plant"),
        ];
        let memberships = vec![
            MembershipRow::new("Node", "bus1", "Region", "north", "Region"),
            MembershipRow::new("Generator", "gas_plant", "Node", "bus1", "Nodes"),
        ];
        let properties = vec![PropertyRecord::scalar("gas_plant", "Max Capacity", 250.0)];
        RelationalSource {
            objects,
            memberships,
            properties,
            datafiles: BTreeMap::new(),
            variables: BTreeMap::new(),
        }
    }

    #[test]
    fn builds_topology_and_generator() {
        let store = MemoryTableStore::new();
        let config = model_config();
        let run = run_config();
        let parser = RelationalParser::new(base_source(), &config, &run, &store);
        let (system, diag) = parser.build().unwrap();

        assert!(system.contains("LoadZone", "north"));
        assert!(system.contains("ACBus", "bus1"));
        let AnyComponent::Generator(generator) = system.get("Generator", "gas_plant").unwrap()
        else {
            panic!("expected a generator");
        };
        assert_eq!(generator.bus, "bus1");
        assert_eq!(generator.family, GeneratorFamily::Thermal);
        assert_eq!(generator.max_active_power(), Some(250.0));
        assert_eq!(diag.error_count(), 0);
    }

    #[test]
    fn interface_without_flow_limits_is_skipped() {
        let mut source = base_source();
        source.objects.push(ObjectRow::new("Interface", "tie"));
        source.objects.push(ObjectRow::new("Interface", "bounded"));
        source
            .properties
            .push(PropertyRecord::scalar("bounded", "Max Flow", 500.0));
        source
            .properties
            .push(PropertyRecord::scalar("bounded", "Min Flow", -500.0));
        let store = MemoryTableStore::new();
        let config = model_config();
        let run = run_config();
        let parser = RelationalParser::new(source, &config, &run, &store);
        let (system, diag) = parser.build().unwrap();

        assert!(!system.contains("TransmissionInterface", "tie"));
        assert!(system.contains("TransmissionInterface", "bounded"));
        assert!(diag.issues.iter().any(|i| {
            i.entity.as_deref() == Some("tie")
                && i.message.contains("Max Flow")
                && i.message.contains("Min Flow")
        }));

        // Only finite limits were kept, so the serialized form loads back.
        let mut buf = Vec::new();
        system.to_json(&mut buf).unwrap();
        let restored = System::from_json(buf.as_slice()).unwrap();
        assert_eq!(restored.len(), system.len());
    }

    #[test]
    fn zero_units_skips_device() {
        let mut source = base_source();
        source
            .properties
            .push(PropertyRecord::scalar("gas_plant", "Units", 0.0));
        let store = MemoryTableStore::new();
        let config = model_config();
        let run = run_config();
        let parser = RelationalParser::new(source, &config, &run, &store);
        let (system, diag) = parser.build().unwrap();

        assert!(!system.contains("Generator", "gas_plant"));
        assert!(diag
            .issues
            .iter()
            .any(|i| i.message.contains("unavailable")));
    }

    #[test]
    fn rating_and_units_scale_capacity() {
        let mut source = base_source();
        source
            .properties
            .push(PropertyRecord::scalar("gas_plant", "Rating", 200.0));
        source
            .properties
            .push(PropertyRecord::scalar("gas_plant", "Units", 3.0));
        let store = MemoryTableStore::new();
        let config = model_config();
        let run = run_config();
        let parser = RelationalParser::new(source, &config, &run, &store);
        let (system, _) = parser.build().unwrap();

        let AnyComponent::Generator(generator) = system.get("Generator", "gas_plant").unwrap()
        else {
            panic!("expected a generator");
        };
        assert_eq!(generator.max_active_power(), Some(600.0));
    }

    #[test]
    fn missing_bus_membership_skips_with_named_fields() {
        let mut source = base_source();
        source.memberships.retain(|m| m.collection != "Nodes");
        let store = MemoryTableStore::new();
        let config = model_config();
        let run = run_config();
        let parser = RelationalParser::new(source, &config, &run, &store);
        let (system, diag) = parser.build().unwrap();

        assert!(!system.contains("Generator", "gas_plant"));
        assert!(diag.issues.iter().any(|i| i.message.contains("bus")));
    }

    #[test]
    fn ambiguous_model_is_fatal() {
        let mut source = base_source();
        source.objects.push(ObjectRow::new("Model", "base"));
        source.objects.push(ObjectRow::new("Model", "base"));
        let store = MemoryTableStore::new();
        let config = model_config();
        let mut run = run_config();
        run.scenario = Some("base".to_string());
        let parser = RelationalParser::new(source, &config, &run, &store);
        assert!(matches!(parser.build(), Err(GctError::Config(_))));
    }

    #[test]
    fn missing_model_is_fatal() {
        let mut source = base_source();
        source.objects.push(ObjectRow::new("Model", "base"));
        let store = MemoryTableStore::new();
        let config = model_config();
        let mut run = run_config();
        run.scenario = Some("absent".to_string());
        let parser = RelationalParser::new(source, &config, &run, &store);
        assert!(matches!(parser.build(), Err(GctError::Config(_))));
    }

    #[test]
    fn model_scenarios_become_active() {
        let mut source = base_source();
        source.objects.push(ObjectRow::new("Model", "base"));
        source.objects.push(ObjectRow::new("Scenario", "high_fuel"));
        source.memberships.push(MembershipRow::new(
            "Model",
            "base",
            "Scenario",
            "high_fuel",
            "Scenarios",
        ));
        source.properties.push(
            PropertyRecord::scalar("gas_plant", "Max Capacity", 300.0)
                .with_scenario("high_fuel"),
        );
        let store = MemoryTableStore::new();
        let config = model_config();
        let mut run = run_config();
        run.scenario = Some("base".to_string());
        let parser = RelationalParser::new(source, &config, &run, &store);
        let (system, _) = parser.build().unwrap();

        let AnyComponent::Generator(generator) = system.get("Generator", "gas_plant").unwrap()
        else {
            panic!("expected a generator");
        };
        assert_eq!(generator.max_active_power(), Some(300.0));
    }
}
