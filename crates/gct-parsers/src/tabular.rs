//! Tabular pipeline: builds a System from a directory of flat CSV tables
//! (ReEDS-style).
//!
//! The source has no object or membership tables; structure is implied.
//! Each region in the hierarchy becomes a zone with exactly one bus,
//! generators are keyed by (technology, region), and transmission rows
//! come in directed pairs that merge into one line per corridor.

use std::collections::{BTreeMap, BTreeSet};

use gct_config::{ModelConfig, RunConfig};
use gct_core::{
    matching::normalize_name, ACBus, AnyComponent, Area, Diagnostics, EmissionType, GctResult,
    Generator, GeneratorFamily, LoadZone, MinMax, MonitoredLine, OperatingCost,
    PowerLoad, Quantity, Reserve, ReserveMap, SingleTimeSeries, System, TransmissionInterface,
    TransmissionInterfaceMap, Unit,
};
use gct_ts::reconcile;

use crate::frames::{column_f64, column_utf8, pl_filter_by_year, pl_remove_duplicates};
use crate::handler::ParserData;

/// Frame keys the tabular pipeline understands.
pub const HIERARCHY: &str = "hierarchy";
pub const CAPACITY: &str = "capacity";
pub const FUEL_PRICE: &str = "fuel_price";
pub const HEAT_RATE: &str = "heat_rate";
pub const OUTAGES: &str = "outages";
pub const STORAGE: &str = "storage";
pub const BRANCHES: &str = "branches";
pub const EMISSIONS: &str = "emissions";
pub const LOAD: &str = "load";
pub const CF: &str = "cf";

pub struct TabularParser<'a> {
    data: ParserData,
    config: &'a ModelConfig,
    run: &'a RunConfig,
    diag: Diagnostics,
}

impl<'a> TabularParser<'a> {
    pub fn new(data: ParserData, config: &'a ModelConfig, run: &'a RunConfig) -> Self {
        Self {
            data,
            config,
            run,
            diag: Diagnostics::new(),
        }
    }

    pub fn build(mut self) -> GctResult<(System, Diagnostics)> {
        let mut system = System::new(&self.run.name);
        self.build_topology(&mut system)?;
        self.build_reserves(&mut system)?;
        self.build_branches(&mut system)?;
        self.build_generators(&mut system)?;
        self.build_emissions(&mut system)?;
        self.build_loads(&mut system)?;
        self.build_profiles(&mut system)?;
        self.split_hybrids(&mut system)?;
        self.provision_reserves(&mut system)?;
        Ok((system, self.diag))
    }

    /// Hierarchy rows give (region, area). One zone and one bus per
    /// region; the bus carries the region's name.
    fn build_topology(&mut self, system: &mut System) -> GctResult<()> {
        let df = self.data.require(HIERARCHY)?.clone();
        let regions = column_utf8(&df, "region")?;
        let areas = column_utf8(&df, "area")?;

        let mut seen_areas = BTreeSet::new();
        for area in areas.iter().flatten() {
            if seen_areas.insert(area.clone()) {
                system.add_component(Area::new(area))?;
            }
        }

        let mut bus_id = 0u64;
        let mut seen_regions = BTreeSet::new();
        for (region, area) in regions.iter().zip(&areas) {
            let Some(region) = region else {
                self.diag
                    .add_warning(HIERARCHY, "hierarchy row without a region, skipped");
                continue;
            };
            if !seen_regions.insert(region.clone()) {
                continue;
            }
            system.add_component(LoadZone::new(region))?;
            bus_id += 1;
            let mut bus = ACBus::new(bus_id, region).with_load_zone(region);
            bus.area = area.clone();
            system.add_component(bus)?;
        }
        Ok(())
    }

    /// Every configured reserve product exists in every region.
    fn build_reserves(&mut self, system: &mut System) -> GctResult<()> {
        let regions: Vec<String> = system
            .iter_type("LoadZone")
            .map(|z| z.name().to_string())
            .collect();
        for (code, spec) in &self.config.reserve_type_map {
            for region in &regions {
                let mut reserve = Reserve::new(
                    format!("{code}_{region}"),
                    spec.reserve_type,
                    spec.direction,
                );
                reserve.region = Some(region.clone());
                reserve.time_frame =
                    Some(self.config.default_f64(&format!("{code}_time_frame"), 600.0));
                system.add_component(reserve)?;
            }
        }
        Ok(())
    }

    /// Directed branch rows merge into one line per corridor. The reverse
    /// row, when present, supplies the reverse rating; a corridor seen in
    /// only one direction gets a symmetric rating.
    fn build_branches(&mut self, system: &mut System) -> GctResult<()> {
        let Some(df) = self.data.get(BRANCHES).cloned() else {
            return Ok(());
        };
        let from = column_utf8(&df, "region_from")?;
        let to = column_utf8(&df, "region_to")?;
        let values = column_f64(&df, "value")?;

        // Summed directional ratings keyed by the sorted region pair.
        let mut forward: BTreeMap<(String, String), f64> = BTreeMap::new();
        let mut reverse: BTreeMap<(String, String), f64> = BTreeMap::new();
        for ((from, to), value) in from.iter().zip(&to).zip(&values) {
            let (Some(from), Some(to), Some(value)) = (from, to, value) else {
                self.diag
                    .add_warning(BRANCHES, "branch row with missing fields, skipped");
                continue;
            };
            if !system.contains("ACBus", from) || !system.contains("ACBus", to) {
                self.diag.add_warning(
                    BRANCHES,
                    format!("branch endpoints '{from}'/'{to}' missing, skipped"),
                );
                continue;
            }
            let key = if from <= to {
                (from.clone(), to.clone())
            } else {
                (to.clone(), from.clone())
            };
            let bucket = if *from == key.0 {
                &mut forward
            } else {
                &mut reverse
            };
            *bucket.entry(key).or_insert(0.0) += value;
        }

        let mut interface_map = TransmissionInterfaceMap::new("transmission_interfaces");
        let mut any_interface = false;
        for (key, fwd) in &forward {
            let rev = reverse.get(key).copied().unwrap_or(*fwd);
            let (a, b) = key;
            let line_name = format!("{a}_{b}");
            let mut line = MonitoredLine::new(&line_name, a.clone(), b.clone());
            line.rating_up = Some(Quantity::new(*fwd, Unit::Megawatt)?);
            line.rating_down = Some(Quantity::new(rev, Unit::Megawatt)?);
            system.add_component(line)?;

            let interface_name = format!("{a}_{b}_interface");
            let interface = TransmissionInterface::new(
                &interface_name,
                MinMax::new(-rev, *fwd)?,
            );
            system.add_component(interface)?;
            interface_map.add_member(&interface_name, &line_name);
            any_interface = true;
        }
        for (key, rev) in &reverse {
            if forward.contains_key(key) {
                continue;
            }
            // Corridor seen only in the reverse direction.
            let (a, b) = key;
            let line_name = format!("{a}_{b}");
            let mut line = MonitoredLine::new(&line_name, a.clone(), b.clone());
            line.rating_up = Some(Quantity::new(*rev, Unit::Megawatt)?);
            line.rating_down = Some(Quantity::new(*rev, Unit::Megawatt)?);
            system.add_component(line)?;

            let interface_name = format!("{a}_{b}_interface");
            let interface =
                TransmissionInterface::new(&interface_name, MinMax::new(-rev, *rev)?);
            system.add_component(interface)?;
            interface_map.add_member(&interface_name, &line_name);
            any_interface = true;
        }
        if any_interface {
            system.add_component(interface_map)?;
        }
        Ok(())
    }

    /// Capacity rows keyed by (tech, region) become generators named
    /// `{tech}_{region}`. Rows sharing a key sum their capacity, which
    /// folds individually-sited variable renewables into one unit per
    /// region. Heat rates, fuel prices, outage rates, and storage
    /// durations come from their side tables when present.
    fn build_generators(&mut self, system: &mut System) -> GctResult<()> {
        let capacity = self.data.require(CAPACITY)?.clone();
        let capacity = pl_filter_by_year(&capacity, self.run.study_year)?;
        let techs = column_utf8(&capacity, "tech")?;
        let regions = column_utf8(&capacity, "region")?;
        let values = column_f64(&capacity, "value")?;

        let heat_rates = self.keyed_year_values(HEAT_RATE, "tech")?;
        let fuel_prices = self.keyed_year_values(FUEL_PRICE, "fuel")?;
        let outages = self.outage_rates()?;
        let durations = self.storage_durations()?;

        let mut grouped: BTreeMap<(String, String), f64> = BTreeMap::new();
        for ((tech, region), value) in techs.iter().zip(&regions).zip(&values) {
            let (Some(tech), Some(region), Some(value)) = (tech, region, value) else {
                self.diag
                    .add_warning(CAPACITY, "capacity row with missing fields, skipped");
                continue;
            };
            if *value <= 0.0 {
                continue;
            }
            *grouped
                .entry((tech.clone(), region.clone()))
                .or_insert(0.0) += value;
        }

        for ((tech, region), capacity_mw) in grouped {
            if !system.contains("ACBus", &region) {
                self.diag.add_warning_with_entity(
                    CAPACITY,
                    format!("region '{region}' not in hierarchy, device skipped"),
                    format!("{tech}_{region}"),
                );
                continue;
            }
            let Some(desc) = self.config.resolve_tech(&tech, None, None) else {
                self.diag.add_warning_with_entity(
                    CAPACITY,
                    "no technology mapping matched, device skipped",
                    format!("{tech}_{region}"),
                );
                continue;
            };
            let Some(family) = self.config.classify(desc.fuel, desc.prime_mover) else {
                self.diag.add_warning_with_entity(
                    CAPACITY,
                    format!(
                        "no rule maps fuel {:?} prime mover {} to a family, device skipped",
                        desc.fuel, desc.prime_mover
                    ),
                    format!("{tech}_{region}"),
                );
                continue;
            };

            let name = format!("{tech}_{region}");
            let mut generator = Generator::new(&name, &region, family, desc.prime_mover)
                .with_base_power(Quantity::new(capacity_mw, Unit::Megawatt)?);
            generator.category = Some(tech.clone());
            generator.fuel = desc.fuel;
            generator.must_run = self.config.is_commit_technology(&tech);
            if let Some((forced, planned)) = outages.get(&normalize_name(&tech)) {
                generator.forced_outage_rate = *forced;
                generator.planned_outage_rate = *planned;
            }

            let heat_rate = heat_rates
                .get(&(normalize_name(&tech), region.clone()))
                .copied();
            let fuel_price = desc.fuel.and_then(|fuel| {
                fuel_prices
                    .get(&(normalize_name(fuel.label()), region.clone()))
                    .copied()
            });
            generator.operating_cost = match family {
                GeneratorFamily::Thermal => OperatingCost::Thermal {
                    heat_rate: quantity_opt(heat_rate, Unit::MillionBtuPerMegawattHour)?,
                    fuel_price: quantity_opt(fuel_price, Unit::UsdPerMillionBtu)?,
                    vom_price: None,
                    start_up_cost: None,
                },
                _ => OperatingCost::for_family(family),
            };

            if family == GeneratorFamily::Storage || family == GeneratorFamily::HydroPumped {
                let duration = durations
                    .get(&normalize_name(&tech))
                    .copied()
                    .unwrap_or_else(|| self.config.default_f64("storage_duration", 4.0));
                generator.storage_capacity =
                    Some(Quantity::new(capacity_mw * duration, Unit::MegawattHour)?);
                let round_trip = self.config.default_f64("round_trip_efficiency", 0.85);
                generator.charge_efficiency = Some(round_trip.sqrt());
                generator.discharge_efficiency = Some(round_trip.sqrt());
            }

            if let Err(e) = generator.validate() {
                self.diag.add_warning_with_entity(
                    CAPACITY,
                    format!("invalid device skipped: {e}"),
                    &name,
                );
                continue;
            }
            system.add_component(generator)?;
        }
        Ok(())
    }

    /// (key, region) -> value for the study year, with normalized keys.
    fn keyed_year_values(
        &mut self,
        frame: &str,
        key_column: &str,
    ) -> GctResult<BTreeMap<(String, String), f64>> {
        let mut out = BTreeMap::new();
        let Some(df) = self.data.get(frame).cloned() else {
            return Ok(out);
        };
        let df = pl_filter_by_year(&df, self.run.study_year)?;
        let df = pl_remove_duplicates(&df, &[key_column, "region"])?;
        let keys = column_utf8(&df, key_column)?;
        let regions = column_utf8(&df, "region")?;
        let values = column_f64(&df, "value")?;
        for ((key, region), value) in keys.iter().zip(&regions).zip(&values) {
            if let (Some(key), Some(region), Some(value)) = (key, region, value) {
                out.insert((normalize_name(key), region.clone()), *value);
            }
        }
        Ok(out)
    }

    /// tech -> (forced, planned) outage fractions.
    fn outage_rates(&mut self) -> GctResult<BTreeMap<String, (Option<f64>, Option<f64>)>> {
        let mut out = BTreeMap::new();
        let Some(df) = self.data.get(OUTAGES) else {
            return Ok(out);
        };
        let techs = column_utf8(df, "tech")?;
        let forced = column_f64(df, "forced_outage_rate")?;
        let planned = column_f64(df, "planned_outage_rate")?;
        for ((tech, f), p) in techs.iter().zip(&forced).zip(&planned) {
            if let Some(tech) = tech {
                out.insert(normalize_name(tech), (*f, *p));
            }
        }
        Ok(out)
    }

    /// tech -> storage duration in hours.
    fn storage_durations(&mut self) -> GctResult<BTreeMap<String, f64>> {
        let mut out = BTreeMap::new();
        let Some(df) = self.data.get(STORAGE) else {
            return Ok(out);
        };
        let techs = column_utf8(df, "tech")?;
        let durations = column_f64(df, "duration")?;
        for (tech, duration) in techs.iter().zip(&durations) {
            if let (Some(tech), Some(duration)) = (tech, duration) {
                out.insert(normalize_name(tech), *duration);
            }
        }
        Ok(out)
    }

    /// Emission rates apply to every generator of the listed technology.
    fn build_emissions(&mut self, system: &mut System) -> GctResult<()> {
        let Some(df) = self.data.get(EMISSIONS).cloned() else {
            return Ok(());
        };
        let techs = column_utf8(&df, "tech")?;
        let kinds = column_utf8(&df, "emission_type")?;
        let rates = column_f64(&df, "rate")?;

        let mut rows: Vec<(String, EmissionType, f64)> = Vec::new();
        for ((tech, kind), rate) in techs.iter().zip(&kinds).zip(&rates) {
            let (Some(tech), Some(kind), Some(rate)) = (tech, kind, rate) else {
                self.diag
                    .add_warning(EMISSIONS, "emission row with missing fields, skipped");
                continue;
            };
            let Some(emission_type) = EmissionType::from_source(kind) else {
                self.diag.add_warning(
                    EMISSIONS,
                    format!("unrecognized emission type '{kind}', row skipped"),
                );
                continue;
            };
            rows.push((normalize_name(tech), emission_type, *rate));
        }

        let targets: Vec<(String, Option<String>)> = system
            .generators()
            .map(|g| (g.name.clone(), g.category.clone()))
            .collect();
        for (tech, emission_type, rate) in rows {
            for (gen_name, category) in &targets {
                let matches = category
                    .as_deref()
                    .map(|c| normalize_name(c) == tech)
                    .unwrap_or(false);
                if matches {
                    system.add_component(gct_core::Emission::new(
                        gen_name,
                        emission_type,
                        Quantity::new(rate, Unit::KilogramPerMegawattHour)?,
                    ))?;
                }
            }
        }
        Ok(())
    }

    /// Hourly demand per region at the weather year. The load component
    /// carries the peak; the shape attaches as a series.
    fn build_loads(&mut self, system: &mut System) -> GctResult<()> {
        let Some(df) = self.data.get(LOAD).cloned() else {
            return Ok(());
        };
        let profiles = reconcile(&df, self.run.weather_year(), &mut self.diag)?;
        for (region, hourly) in profiles {
            if !system.contains("ACBus", &region) {
                self.diag.add_warning_with_entity(
                    LOAD,
                    "load profile for unknown region, skipped",
                    &region,
                );
                continue;
            }
            let peak = hourly.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let name = format!("{region}_load");
            let mut load = PowerLoad::new(&name, &region);
            load.max_active_power = Some(Quantity::new(peak, Unit::Megawatt)?);
            system.add_component(load)?;
            system.add_time_series(
                "PowerLoad",
                &name,
                SingleTimeSeries::hourly_for_year(
                    "max_active_power",
                    self.run.weather_year(),
                    hourly,
                )?,
            )?;
        }
        Ok(())
    }

    /// Capacity-factor profiles named `{tech}_{region}` attach to the
    /// matching generator as its hourly rating fraction.
    fn build_profiles(&mut self, system: &mut System) -> GctResult<()> {
        let Some(df) = self.data.get(CF).cloned() else {
            return Ok(());
        };
        let profiles = reconcile(&df, self.run.weather_year(), &mut self.diag)?;
        let generators: BTreeMap<String, String> = system
            .generators()
            .map(|g| (normalize_name(&g.name), g.name.clone()))
            .collect();
        for (profile_name, hourly) in profiles {
            let Some(gen_name) = generators.get(&normalize_name(&profile_name)) else {
                self.diag.add_warning_with_entity(
                    CF,
                    "profile matches no generator, skipped",
                    &profile_name,
                );
                continue;
            };
            system.add_time_series(
                "Generator",
                gen_name,
                SingleTimeSeries::hourly_for_year(
                    "max_active_power",
                    self.run.weather_year(),
                    hourly,
                )?,
            )?;
        }
        Ok(())
    }

    /// Hybrid PV-plus-battery units split into a storage half and a
    /// renewable half; the combined original is removed.
    fn split_hybrids(&mut self, system: &mut System) -> GctResult<()> {
        let hybrids: Vec<String> = system
            .generators()
            .filter(|g| {
                g.category
                    .as_deref()
                    .map(|c| normalize_name(c).contains("pvb"))
                    .unwrap_or(false)
            })
            .map(|g| g.name.clone())
            .collect();
        for name in hybrids {
            let pv_name = format!("{name}_pv");
            let storage_name = format!("{name}_storage");
            system.copy_component("Generator", &name, &pv_name)?;
            if let Some(AnyComponent::Generator(pv)) = system.get_mut("Generator", &pv_name) {
                pv.family = GeneratorFamily::RenewableDispatch;
                pv.operating_cost = OperatingCost::for_family(GeneratorFamily::RenewableDispatch);
                pv.storage_capacity = None;
                pv.charge_efficiency = None;
                pv.discharge_efficiency = None;
            }
            system.copy_component("Generator", &name, &storage_name)?;
            if let Some(AnyComponent::Generator(storage)) =
                system.get_mut("Generator", &storage_name)
            {
                storage.family = GeneratorFamily::Storage;
                storage.operating_cost = OperatingCost::for_family(GeneratorFamily::Storage);
                if storage.storage_capacity.is_none() {
                    let duration = self.config.default_f64("storage_duration", 4.0);
                    let base = storage.max_active_power().unwrap_or(0.0);
                    storage.storage_capacity =
                        Some(Quantity::new(base * duration, Unit::MegawattHour)?);
                }
            }
            // Re-home the hybrid's profile on the renewable half.
            let series = system.get_time_series("Generator", &name, "max_active_power").cloned();
            system.remove("Generator", &name)?;
            if let Some(series) = series {
                system.add_time_series("Generator", &pv_name, series)?;
            }
        }
        Ok(())
    }

    /// Default reserve membership and requirement profiles. Generators
    /// join every reserve in their region unless their technology is
    /// excluded; each reserve's requirement combines the regional load
    /// and variable-renewable output at their configured fractions.
    fn provision_reserves(&mut self, system: &mut System) -> GctResult<()> {
        let reserves: Vec<(String, Option<String>)> = system
            .iter_type("Reserve")
            .filter_map(|c| match c {
                AnyComponent::Reserve(r) => Some((r.name.clone(), r.region.clone())),
                _ => None,
            })
            .collect();
        if reserves.is_empty() {
            return Ok(());
        }

        let mut map = ReserveMap::new("reserve_membership");
        let members: Vec<(String, String, Option<String>)> = system
            .generators()
            .map(|g| (g.name.clone(), g.bus.clone(), g.category.clone()))
            .collect();
        for (reserve_name, region) in &reserves {
            let Some(region) = region else { continue };
            for (gen_name, bus, category) in &members {
                if bus != region {
                    continue;
                }
                let excluded = category
                    .as_deref()
                    .map(|c| self.excluded_from_reserves(c))
                    .unwrap_or(false);
                if !excluded {
                    map.add_member(reserve_name, gen_name);
                }
            }
        }
        if !map.mapping.is_empty() {
            system.add_component(map)?;
        }

        for (reserve_name, region) in &reserves {
            let Some(region) = region else { continue };
            let code = reserve_name
                .strip_suffix(&format!("_{region}"))
                .unwrap_or(reserve_name);
            let Some(requirement) = self.requirement_profile(system, code, region)? else {
                continue;
            };
            let peak = requirement.max();
            system.add_time_series("Reserve", reserve_name, requirement)?;
            if let Some(AnyComponent::Reserve(reserve)) = system.get_mut("Reserve", reserve_name)
            {
                reserve.max_requirement = Some(Quantity::new(peak, Unit::Megawatt)?);
            }
        }
        Ok(())
    }

    /// Requirement shape for one reserve: configured fractions of the
    /// regional load plus the regional variable-renewable output.
    fn requirement_profile(
        &self,
        system: &System,
        code: &str,
        region: &str,
    ) -> GctResult<Option<SingleTimeSeries>> {
        let load_multiplier = self
            .config
            .default_f64(&format!("{code}_load_multiplier"), 0.0);
        let vre_multiplier = self
            .config
            .default_f64(&format!("{code}_vre_multiplier"), 0.0);
        if load_multiplier == 0.0 && vre_multiplier == 0.0 {
            return Ok(None);
        }

        let mut combined: Option<Vec<f64>> = None;
        let mut accumulate = |data: &[f64], factor: f64| {
            let sum = combined.get_or_insert_with(|| vec![0.0; data.len()]);
            for (acc, v) in sum.iter_mut().zip(data) {
                *acc += v * factor;
            }
        };

        if load_multiplier != 0.0 {
            let load_name = format!("{region}_load");
            if let Some(series) =
                system.get_time_series("PowerLoad", &load_name, "max_active_power")
            {
                accumulate(&series.data, load_multiplier);
            }
        }
        if vre_multiplier != 0.0 {
            for generator in system.generators() {
                if generator.bus != region || !generator.family.is_renewable() {
                    continue;
                }
                let capacity = generator.max_active_power().unwrap_or(0.0);
                if let Some(series) =
                    system.get_time_series("Generator", &generator.name, "max_active_power")
                {
                    // Capacity-factor profiles are fractions of nameplate.
                    accumulate(&series.data, vre_multiplier * capacity);
                }
            }
        }

        let Some(data) = combined else {
            return Ok(None);
        };
        let series =
            SingleTimeSeries::hourly_for_year("requirement", self.run.weather_year(), data)?;
        Ok(Some(series))
    }

    fn excluded_from_reserves(&self, tech: &str) -> bool {
        let normalized = normalize_name(tech);
        self.config
            .excluded_reserve_techs
            .iter()
            .any(|t| normalize_name(t) == normalized)
    }
}

fn quantity_opt(value: Option<f64>, unit: Unit) -> GctResult<Option<Quantity>> {
    match value {
        Some(v) => Ok(Some(Quantity::new(v, unit)?)),
        None => Ok(None),
    }
}
