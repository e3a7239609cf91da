//! Static vocabulary: fund categories, Korean field labels, metric labels.
//!
//! Everything here is read-only and initialised once per process.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Months covered by the output matrix.
pub const WINDOW_MONTHS: usize = 60;

/// Data columns in the standard template (11 categories x 13 series).
pub const TEMPLATE_ENTRIES: usize = 143;

/// Rows scanned from the top of a sheet when looking for the header.
pub const HEADER_SCAN_ROWS: usize = 20;

/// Literal written for any expected-but-unavailable value.
pub const SENTINEL: &str = "N.A.";

/// Label of the leading column in both header rows.
pub const DATE_LABEL: &str = "Date";

/// Korean header labels the source uses for its period column.
pub const DATE_HEADER_LABELS: &[&str] = &["기준일자", "기준일"];

/// Fund type as offered by the KOFIA query form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FundType {
    Equity,
    HybridEquity,
    HybridBond,
    Bond,
    MoneyMarket,
    HybridAsset,
}

impl FundType {
    pub fn korean(self) -> &'static str {
        match self {
            FundType::Equity => "주식형",
            FundType::HybridEquity => "혼합형주식",
            FundType::HybridBond => "혼합형채권",
            FundType::Bond => "채권형",
            FundType::MoneyMarket => "MMF",
            FundType::HybridAsset => "혼합자산",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    All,
    Domestic,
}

impl Region {
    pub fn korean(self) -> &'static str {
        match self {
            Region::All => "전체",
            Region::Domestic => "국내",
        }
    }
}

/// One of the eleven (fund type, region) datasets.
///
/// Declaration order is the template's column order; nothing else depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Equity,
    DomesticEquity,
    HybridEquity,
    HybridDomesticEquity,
    HybridBond,
    HybridDomesticBond,
    Bond,
    DomesticBond,
    MoneyMarket,
    HybridAsset,
    DomesticHybridAsset,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Equity,
        Category::DomesticEquity,
        Category::HybridEquity,
        Category::HybridDomesticEquity,
        Category::HybridBond,
        Category::HybridDomesticBond,
        Category::Bond,
        Category::DomesticBond,
        Category::MoneyMarket,
        Category::HybridAsset,
        Category::DomesticHybridAsset,
    ];

    pub fn fund_type(self) -> FundType {
        match self {
            Category::Equity | Category::DomesticEquity => FundType::Equity,
            Category::HybridEquity | Category::HybridDomesticEquity => FundType::HybridEquity,
            Category::HybridBond | Category::HybridDomesticBond => FundType::HybridBond,
            Category::Bond | Category::DomesticBond => FundType::Bond,
            Category::MoneyMarket => FundType::MoneyMarket,
            Category::HybridAsset | Category::DomesticHybridAsset => FundType::HybridAsset,
        }
    }

    pub fn region(self) -> Region {
        match self {
            Category::DomesticEquity
            | Category::HybridDomesticEquity
            | Category::HybridDomesticBond
            | Category::DomesticBond
            | Category::DomesticHybridAsset => Region::Domestic,
            _ => Region::All,
        }
    }

    /// Dataset name used for download files and series descriptions.
    pub fn dataset_name(self) -> &'static str {
        match self {
            Category::Equity => "Equity",
            Category::DomesticEquity => "DomesticEquity",
            Category::HybridEquity => "HybridEquity",
            Category::HybridDomesticEquity => "HybridDomesticEquity",
            Category::HybridBond => "HybridBond",
            Category::HybridDomesticBond => "HybridDomesticBond",
            Category::Bond => "Bond",
            Category::DomesticBond => "DomesticBond",
            Category::MoneyMarket => "MoneyMarket",
            Category::HybridAsset => "HybridAsset",
            Category::DomesticHybridAsset => "DomesticHybridAsset",
        }
    }

    /// Segment used in canonical codes. Several are shortened forms.
    pub fn code_prefix(self) -> &'static str {
        match self {
            Category::Equity => "EQUITY",
            Category::DomesticEquity => "DOMESTICEQUITY",
            Category::HybridEquity => "HYBRIDEQUITY",
            Category::HybridDomesticEquity => "HYBRIDDOMEQUITY",
            Category::HybridBond => "HYBRIDBOND",
            Category::HybridDomesticBond => "HYBRIDDOMBOND",
            Category::Bond => "BOND",
            Category::DomesticBond => "DOMBOND",
            Category::MoneyMarket => "MONEYMARKET",
            Category::HybridAsset => "HYBRIDASSET",
            Category::DomesticHybridAsset => "DOMHYBRIDASSET",
        }
    }

    pub fn from_parts(fund_type: FundType, region: Region) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|c| c.fund_type() == fund_type && c.region() == region)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dataset_name())
    }
}

/// Asset field reported by the composition export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    TotalAsset,
    Stock,
    Bonds,
    Cp,
    Deposit,
    CallLoan,
    Other,
    // Recognised but not tracked by the standard template.
    Notes,
    CollectiveInvestmentSecurities,
    Derivatives,
    RealEstate,
    SpecialAssets,
}

impl Field {
    /// Fields carried by the standard template, in column order.
    pub const TRACKED: [Field; 7] = [
        Field::TotalAsset,
        Field::Stock,
        Field::Bonds,
        Field::Cp,
        Field::Deposit,
        Field::CallLoan,
        Field::Other,
    ];

    pub fn code_segment(self) -> &'static str {
        match self {
            Field::TotalAsset => "TOTALASSET",
            Field::Stock => "STOCK",
            Field::Bonds => "BONDS",
            Field::Cp => "CP",
            Field::Deposit => "DEPOSIT",
            Field::CallLoan => "CALLLOAN",
            Field::Other => "OTHER",
            Field::Notes => "NOTES",
            Field::CollectiveInvestmentSecurities => "COLLECTIVEINVESTMENTSECURITIES",
            Field::Derivatives => "DERIVATIVES",
            Field::RealEstate => "REALESTATE",
            Field::SpecialAssets => "SPECIALASSETS",
        }
    }

    pub fn english(self) -> &'static str {
        match self {
            Field::TotalAsset => "Total assets",
            Field::Stock => "Stock",
            Field::Bonds => "Bonds",
            Field::Cp => "CP",
            Field::Deposit => "Deposit",
            Field::CallLoan => "Call loan",
            Field::Other => "Others",
            Field::Notes => "Notes",
            Field::CollectiveInvestmentSecurities => "Collective investment securities",
            Field::Derivatives => "Derivatives",
            Field::RealEstate => "Real estate",
            Field::SpecialAssets => "Special assets",
        }
    }

    /// Single-valued fields have no amount/weight split.
    pub fn is_single_valued(self) -> bool {
        matches!(self, Field::TotalAsset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Amount,
    Weight,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Amount, Metric::Weight];

    pub fn code_segment(self) -> &'static str {
        match self {
            Metric::Amount => "AMOUNT",
            Metric::Weight => "WEIGHT",
        }
    }

    pub fn english(self) -> &'static str {
        match self {
            Metric::Amount => "Amount",
            Metric::Weight => "Weight",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Amount => "KRW Million",
            Metric::Weight => "Percentage",
        }
    }
}

/// Normalised Korean field label -> field.
pub static FIELD_LABELS: Lazy<HashMap<&'static str, Field>> = Lazy::new(|| {
    HashMap::from([
        ("자산총액", Field::TotalAsset),
        ("주식", Field::Stock),
        ("채권", Field::Bonds),
        ("CP", Field::Cp),
        ("예금", Field::Deposit),
        ("단기대출및예금", Field::Deposit),
        ("콜론", Field::CallLoan),
        ("기타", Field::Other),
        ("어음", Field::Notes),
        ("집합투자증권", Field::CollectiveInvestmentSecurities),
        ("파생상품", Field::Derivatives),
        ("부동산", Field::RealEstate),
        ("특별자산", Field::SpecialAssets),
    ])
});

/// Normalised Korean metric label -> metric.
pub static METRIC_LABELS: Lazy<HashMap<&'static str, Metric>> =
    Lazy::new(|| HashMap::from([("금액", Metric::Amount), ("비중", Metric::Weight)]));

pub fn lookup_field(label: &str) -> Option<Field> {
    FIELD_LABELS.get(label).copied()
}

pub fn lookup_metric(label: &str) -> Option<Metric> {
    METRIC_LABELS.get(label).copied()
}
