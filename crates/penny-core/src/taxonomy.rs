//! Fixed expense category taxonomy
//!
//! Categories are a closed enumeration so an invalid category is a type
//! error, not a runtime constraint violation. Each category belongs to a
//! group (materials, paint, labor, ...) and carries keyword lists used by
//! query entity extraction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Expense categories for home renovation projects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    MaterialsLumber,
    MaterialsConcrete,
    MaterialsSteel,
    MaterialsStone,
    MaterialsTile,
    MaterialsFlooring,
    MaterialsInsulation,
    MaterialsRoofing,
    MaterialsSiding,
    MaterialsWindows,
    MaterialsDoors,
    PaintInterior,
    PaintExterior,
    PaintSupplies,
    ElectricalFixtures,
    ElectricalWiring,
    ElectricalOutlets,
    PlumbingFixtures,
    PlumbingPipes,
    PlumbingFittings,
    HvacUnits,
    HvacDuctwork,
    HvacMaintenance,
    AppliancesKitchen,
    AppliancesLaundry,
    AppliancesOther,
    ToolsPower,
    ToolsHand,
    ToolsRental,
    LaborContractor,
    LaborElectrician,
    LaborPlumber,
    LaborHvac,
    LaborPainter,
    LaborFlooring,
    LaborGeneral,
    PermitsBuilding,
    PermitsElectrical,
    PermitsPlumbing,
    DeliveryMaterials,
    DeliveryAppliances,
    WasteDisposal,
    Miscellaneous,
}

/// Category groups (the prefix level of the taxonomy)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryGroup {
    Materials,
    Paint,
    Electrical,
    Plumbing,
    Hvac,
    Appliances,
    Tools,
    Labor,
    Permits,
    Delivery,
    Waste,
    Miscellaneous,
}

impl ExpenseCategory {
    /// Every category in the taxonomy, in declaration order
    pub const ALL: [ExpenseCategory; 43] = [
        Self::MaterialsLumber,
        Self::MaterialsConcrete,
        Self::MaterialsSteel,
        Self::MaterialsStone,
        Self::MaterialsTile,
        Self::MaterialsFlooring,
        Self::MaterialsInsulation,
        Self::MaterialsRoofing,
        Self::MaterialsSiding,
        Self::MaterialsWindows,
        Self::MaterialsDoors,
        Self::PaintInterior,
        Self::PaintExterior,
        Self::PaintSupplies,
        Self::ElectricalFixtures,
        Self::ElectricalWiring,
        Self::ElectricalOutlets,
        Self::PlumbingFixtures,
        Self::PlumbingPipes,
        Self::PlumbingFittings,
        Self::HvacUnits,
        Self::HvacDuctwork,
        Self::HvacMaintenance,
        Self::AppliancesKitchen,
        Self::AppliancesLaundry,
        Self::AppliancesOther,
        Self::ToolsPower,
        Self::ToolsHand,
        Self::ToolsRental,
        Self::LaborContractor,
        Self::LaborElectrician,
        Self::LaborPlumber,
        Self::LaborHvac,
        Self::LaborPainter,
        Self::LaborFlooring,
        Self::LaborGeneral,
        Self::PermitsBuilding,
        Self::PermitsElectrical,
        Self::PermitsPlumbing,
        Self::DeliveryMaterials,
        Self::DeliveryAppliances,
        Self::WasteDisposal,
        Self::Miscellaneous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaterialsLumber => "materials_lumber",
            Self::MaterialsConcrete => "materials_concrete",
            Self::MaterialsSteel => "materials_steel",
            Self::MaterialsStone => "materials_stone",
            Self::MaterialsTile => "materials_tile",
            Self::MaterialsFlooring => "materials_flooring",
            Self::MaterialsInsulation => "materials_insulation",
            Self::MaterialsRoofing => "materials_roofing",
            Self::MaterialsSiding => "materials_siding",
            Self::MaterialsWindows => "materials_windows",
            Self::MaterialsDoors => "materials_doors",
            Self::PaintInterior => "paint_interior",
            Self::PaintExterior => "paint_exterior",
            Self::PaintSupplies => "paint_supplies",
            Self::ElectricalFixtures => "electrical_fixtures",
            Self::ElectricalWiring => "electrical_wiring",
            Self::ElectricalOutlets => "electrical_outlets",
            Self::PlumbingFixtures => "plumbing_fixtures",
            Self::PlumbingPipes => "plumbing_pipes",
            Self::PlumbingFittings => "plumbing_fittings",
            Self::HvacUnits => "hvac_units",
            Self::HvacDuctwork => "hvac_ductwork",
            Self::HvacMaintenance => "hvac_maintenance",
            Self::AppliancesKitchen => "appliances_kitchen",
            Self::AppliancesLaundry => "appliances_laundry",
            Self::AppliancesOther => "appliances_other",
            Self::ToolsPower => "tools_power",
            Self::ToolsHand => "tools_hand",
            Self::ToolsRental => "tools_rental",
            Self::LaborContractor => "labor_contractor",
            Self::LaborElectrician => "labor_electrician",
            Self::LaborPlumber => "labor_plumber",
            Self::LaborHvac => "labor_hvac",
            Self::LaborPainter => "labor_painter",
            Self::LaborFlooring => "labor_flooring",
            Self::LaborGeneral => "labor_general",
            Self::PermitsBuilding => "permits_building",
            Self::PermitsElectrical => "permits_electrical",
            Self::PermitsPlumbing => "permits_plumbing",
            Self::DeliveryMaterials => "delivery_materials",
            Self::DeliveryAppliances => "delivery_appliances",
            Self::WasteDisposal => "waste_disposal",
            Self::Miscellaneous => "miscellaneous",
        }
    }

    /// The group this category belongs to
    pub fn group(&self) -> CategoryGroup {
        match self.as_str().split('_').next().unwrap_or("") {
            "materials" => CategoryGroup::Materials,
            "paint" => CategoryGroup::Paint,
            "electrical" => CategoryGroup::Electrical,
            "plumbing" => CategoryGroup::Plumbing,
            "hvac" => CategoryGroup::Hvac,
            "appliances" => CategoryGroup::Appliances,
            "tools" => CategoryGroup::Tools,
            "labor" => CategoryGroup::Labor,
            "permits" => CategoryGroup::Permits,
            "delivery" => CategoryGroup::Delivery,
            "waste" => CategoryGroup::Waste,
            _ => CategoryGroup::Miscellaneous,
        }
    }

    /// Keywords that identify this specific category in free text
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::MaterialsLumber => &["lumber", "wood", "stud", "plywood", "board"],
            Self::MaterialsConcrete => &["concrete", "cement", "mortar"],
            Self::MaterialsSteel => &["steel", "rebar", "beam"],
            Self::MaterialsStone => &["stone", "granite", "marble"],
            Self::MaterialsTile => &["tile", "grout", "backsplash"],
            Self::MaterialsFlooring => &["flooring", "hardwood", "laminate", "vinyl"],
            Self::MaterialsInsulation => &["insulation", "fiberglass", "foam"],
            Self::MaterialsRoofing => &["roofing", "shingle", "roof"],
            Self::MaterialsSiding => &["siding", "clapboard"],
            Self::MaterialsWindows => &["window", "windows", "glazing"],
            Self::MaterialsDoors => &["door", "doors"],
            Self::PaintInterior => &["interior paint"],
            Self::PaintExterior => &["exterior paint"],
            Self::PaintSupplies => &["primer", "brush", "roller", "drop cloth"],
            Self::ElectricalFixtures => &["light fixture", "chandelier", "sconce"],
            Self::ElectricalWiring => &["wiring", "wire", "cable", "romex"],
            Self::ElectricalOutlets => &["outlet", "receptacle", "switch"],
            Self::PlumbingFixtures => &["faucet", "sink", "toilet", "shower", "tub"],
            Self::PlumbingPipes => &["pipe", "pipes", "pex", "copper pipe"],
            Self::PlumbingFittings => &["fitting", "valve", "coupling"],
            Self::HvacUnits => &["furnace", "air conditioner", "heat pump"],
            Self::HvacDuctwork => &["duct", "ductwork", "vent"],
            Self::HvacMaintenance => &["hvac service", "filter"],
            Self::AppliancesKitchen => &["refrigerator", "dishwasher", "stove", "oven", "range"],
            Self::AppliancesLaundry => &["washer", "dryer"],
            Self::AppliancesOther => &["water heater"],
            Self::ToolsPower => &["drill", "saw", "sander", "power tool"],
            Self::ToolsHand => &["hammer", "screwdriver", "wrench", "hand tool"],
            Self::ToolsRental => &["rental", "rented"],
            Self::LaborContractor => &["contractor", "general contractor"],
            Self::LaborElectrician => &["electrician"],
            Self::LaborPlumber => &["plumber"],
            Self::LaborHvac => &["hvac tech", "hvac install"],
            Self::LaborPainter => &["painter", "painting labor"],
            Self::LaborFlooring => &["flooring install"],
            Self::LaborGeneral => &["labor", "handyman", "install"],
            Self::PermitsBuilding => &["building permit"],
            Self::PermitsElectrical => &["electrical permit"],
            Self::PermitsPlumbing => &["plumbing permit"],
            Self::DeliveryMaterials => &["delivery", "freight", "shipping"],
            Self::DeliveryAppliances => &["appliance delivery"],
            Self::WasteDisposal => &["dumpster", "disposal", "haul away", "debris"],
            Self::Miscellaneous => &[],
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown expense category: {}", s))
    }
}

impl CategoryGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Materials => "materials",
            Self::Paint => "paint",
            Self::Electrical => "electrical",
            Self::Plumbing => "plumbing",
            Self::Hvac => "hvac",
            Self::Appliances => "appliances",
            Self::Tools => "tools",
            Self::Labor => "labor",
            Self::Permits => "permits",
            Self::Delivery => "delivery",
            Self::Waste => "waste",
            Self::Miscellaneous => "miscellaneous",
        }
    }

    /// Keywords that identify the whole group in free text (e.g. "paint"
    /// should match every paint_* category)
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Materials => &["materials", "material"],
            Self::Paint => &["paint", "painting"],
            Self::Electrical => &["electrical", "electric"],
            Self::Plumbing => &["plumbing"],
            Self::Hvac => &["hvac", "heating", "cooling"],
            Self::Appliances => &["appliance", "appliances"],
            Self::Tools => &["tool", "tools"],
            Self::Labor => &["labor", "labour"],
            Self::Permits => &["permit", "permits"],
            Self::Delivery => &["delivery", "deliveries"],
            Self::Waste => &["waste", "trash", "junk"],
            Self::Miscellaneous => &["misc", "miscellaneous"],
        }
    }

    /// All member categories of this group
    pub fn members(&self) -> Vec<ExpenseCategory> {
        ExpenseCategory::ALL
            .iter()
            .filter(|c| c.group() == *self)
            .copied()
            .collect()
    }
}

impl fmt::Display for CategoryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// All category groups
pub const ALL_GROUPS: [CategoryGroup; 12] = [
    CategoryGroup::Materials,
    CategoryGroup::Paint,
    CategoryGroup::Electrical,
    CategoryGroup::Plumbing,
    CategoryGroup::Hvac,
    CategoryGroup::Appliances,
    CategoryGroup::Tools,
    CategoryGroup::Labor,
    CategoryGroup::Permits,
    CategoryGroup::Delivery,
    CategoryGroup::Waste,
    CategoryGroup::Miscellaneous,
];

/// Find categories referenced in free text.
///
/// A group keyword ("paint") expands to every member of the group; a
/// category keyword ("lumber") adds just that category. Matching is
/// case-insensitive and phrase-aware (multi-word keywords match as
/// substrings of the lowercased text).
pub fn categories_in_text(text: &str) -> Vec<ExpenseCategory> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let word_hit = |kw: &str| -> bool {
        if kw.contains(' ') {
            lower.contains(kw)
        } else {
            words.iter().any(|w| *w == kw)
        }
    };

    let mut found = Vec::new();

    // Specific categories first so "lumber" doesn't only resolve to the group
    for category in ExpenseCategory::ALL {
        if category.keywords().iter().any(|kw| word_hit(kw)) && !found.contains(&category) {
            found.push(category);
        }
    }

    for group in ALL_GROUPS {
        if group.keywords().iter().any(|kw| word_hit(kw)) {
            for member in group.members() {
                if !found.contains(&member) {
                    found.push(member);
                }
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_all_categories() {
        for category in ExpenseCategory::ALL {
            let parsed: ExpenseCategory = category.as_str().parse().unwrap();
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn test_group_assignment() {
        assert_eq!(ExpenseCategory::MaterialsLumber.group(), CategoryGroup::Materials);
        assert_eq!(ExpenseCategory::PaintInterior.group(), CategoryGroup::Paint);
        assert_eq!(ExpenseCategory::LaborPlumber.group(), CategoryGroup::Labor);
        assert_eq!(ExpenseCategory::Miscellaneous.group(), CategoryGroup::Miscellaneous);
    }

    #[test]
    fn test_group_keyword_expands_to_members() {
        let found = categories_in_text("how much did I spend on paint this summer");
        assert!(found.contains(&ExpenseCategory::PaintInterior));
        assert!(found.contains(&ExpenseCategory::PaintExterior));
        assert!(found.contains(&ExpenseCategory::PaintSupplies));
    }

    #[test]
    fn test_category_keyword_matches_specific() {
        let found = categories_in_text("receipts for lumber");
        assert!(found.contains(&ExpenseCategory::MaterialsLumber));
        assert!(!found.contains(&ExpenseCategory::MaterialsConcrete));
    }

    #[test]
    fn test_no_category_in_unrelated_text() {
        let found = categories_in_text("what is the weather like");
        assert!(found.is_empty());
    }

    #[test]
    fn test_phrase_keyword() {
        let found = categories_in_text("building permit fee for the addition");
        assert!(found.contains(&ExpenseCategory::PermitsBuilding));
    }
}
