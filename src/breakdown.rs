// 💸 Pay Breakdown - ordered line items plus the flow graph a renderer draws
//
// Every item knows which edge carries its amount, so a Sankey/flow renderer
// never has to rebuild the relationships between pay, income and outflows.

use serde::{Deserialize, Serialize};

pub const BASE_PAY_LABEL: &str = "Base Pay";
pub const HOUSING_LABEL: &str = "BAH";
pub const SUBSISTENCE_LABEL: &str = "BAS";
pub const TOTAL_INCOME_LABEL: &str = "Total Monthly Income";
pub const EMPLOYER_MATCH_LABEL: &str = "Agency Match";
pub const RETIREMENT_LABEL: &str = "TSP";
pub const FEDERAL_TAX_LABEL: &str = "Federal Income Tax (Est)";

// ============================================================================
// LINE ITEMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowCategory {
    /// Feeds the total monthly income node
    Income,
    /// Leaves the member's pocket
    Deduction,
    /// Aggregation or bypass nodes (total income, employer match)
    PassThrough,
}

impl FlowCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowCategory::Income => "income",
            FlowCategory::Deduction => "deduction",
            FlowCategory::PassThrough => "pass-through",
        }
    }
}

/// Edge carrying an item's amount, as indices into the breakdown's items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLink {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub label: String,
    pub amount: f64,
    pub category: FlowCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<ItemLink>,
}

// ============================================================================
// BREAKDOWN
// ============================================================================

/// One resolution's result. Built fresh per request, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayBreakdown {
    items: Vec<LineItem>,

    /// Index of the total monthly income node. Labels are free text, so the
    /// aggregate is tracked by position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    total: Option<usize>,
}

impl PayBreakdown {
    pub(crate) fn new() -> Self {
        PayBreakdown {
            items: Vec::new(),
            total: None,
        }
    }

    /// Append an item and return its index
    pub(crate) fn push(&mut self, label: impl Into<String>, amount: f64, category: FlowCategory) -> usize {
        self.items.push(LineItem {
            label: label.into(),
            amount,
            category,
            link: None,
        });
        self.items.len() - 1
    }

    /// Append the total monthly income node every income feeds into
    pub(crate) fn push_total(&mut self, amount: f64) -> usize {
        let index = self.push(TOTAL_INCOME_LABEL, amount, FlowCategory::PassThrough);
        self.total = Some(index);
        index
    }

    /// Route item `index`'s amount along `from → to`
    pub(crate) fn link(&mut self, index: usize, from: usize, to: usize) {
        self.items[index].link = Some(ItemLink { from, to });
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First item with this label
    pub fn get(&self, label: &str) -> Option<&LineItem> {
        self.items.iter().find(|item| item.label == label)
    }

    pub fn amount(&self, label: &str) -> Option<f64> {
        self.get(label).map(|item| item.amount)
    }

    pub fn total_index(&self) -> Option<usize> {
        self.total
    }

    pub fn total_income(&self) -> f64 {
        self.total
            .and_then(|index| self.items.get(index))
            .map_or(0.0, |item| item.amount)
    }

    /// Everything deducted from the member: TSP contribution, expenses, tax.
    /// The employer match is not the member's money and is excluded.
    pub fn total_outflow(&self) -> f64 {
        self.items
            .iter()
            .filter(|item| item.category == FlowCategory::Deduction)
            .map(|item| item.amount)
            .sum()
    }

    /// Income left after all deductions (negative when over budget)
    pub fn net_remaining(&self) -> f64 {
        self.total_income() - self.total_outflow()
    }

    /// Nodes and weighted edges for a flow diagram
    pub fn flow_graph(&self) -> FlowGraph {
        FlowGraph {
            nodes: self.items.iter().map(|item| item.label.clone()).collect(),
            links: self
                .items
                .iter()
                .filter_map(|item| {
                    item.link.map(|link| FlowLink {
                        source: link.from,
                        target: link.to,
                        value: item.amount,
                    })
                })
                .collect(),
        }
    }
}

// ============================================================================
// FLOW GRAPH
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowLink {
    pub source: usize,
    pub target: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    pub nodes: Vec<String>,
    pub links: Vec<FlowLink>,
}

impl FlowGraph {
    /// Sum of link values arriving at `node`
    pub fn inflow(&self, node: usize) -> f64 {
        self.links
            .iter()
            .filter(|link| link.target == node)
            .map(|link| link.value)
            .sum()
    }

    /// Sum of link values leaving `node`
    pub fn outflow(&self, node: usize) -> f64 {
        self.links
            .iter()
            .filter(|link| link.source == node)
            .map(|link| link.value)
            .sum()
    }
}

/// Round to whole cents for display
pub fn cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

// ============================================================================
// TESTS
// ============================================================================
