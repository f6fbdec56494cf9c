use super::model::Resource;
use crate::search::{Ranked, SearchMatcher, rank};

/// Category reserved for teacher-empowerment material
pub const EMPOWERMENT_CATEGORY: &str = "赋能教学";

/// Grade value that matches every grade filter
pub const UNIVERSAL_GRADE: &str = "通用";

/// A selectable filter value: stable id plus display label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOption {
    pub id: &'static str,
    pub label: &'static str,
}

const fn option(id: &'static str, label: &'static str) -> FilterOption {
    FilterOption { id, label }
}

pub const CATEGORIES: [FilterOption; 8] = [
    option("all", "全部"),
    option("algebra", "数与代数"),
    option("geometry", "图形与几何"),
    option("statistics", "统计与概率"),
    option("practice", "综合实践"),
    option("micro", "微课"),
    option("exercises", "习题"),
    option("other", "其它"),
];

pub const GRADES: [FilterOption; 6] = [
    option("1", "一年级"),
    option("2", "二年级"),
    option("3", "三年级"),
    option("4", "四年级"),
    option("5", "五年级"),
    option("6", "六年级"),
];

fn find_option(options: &[FilterOption], value: &str) -> Option<FilterOption> {
    let value = value.trim();
    options
        .iter()
        .copied()
        .find(|o| o.id.eq_ignore_ascii_case(value) || o.label == value)
}

/// Look up a category by id or label
pub fn find_category(value: &str) -> Option<FilterOption> {
    find_option(&CATEGORIES, value)
}

/// Look up a grade by id or label
pub fn find_grade(value: &str) -> Option<FilterOption> {
    find_option(&GRADES, value)
}

/// Which slice of the catalog a listing shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogView {
    /// Launchable tools outside the empowerment category
    #[default]
    Interactive,
    /// Only the empowerment category
    Empowerment,
}

impl CatalogView {
    pub fn includes(&self, resource: &Resource) -> bool {
        match self {
            CatalogView::Interactive => {
                resource.category != EMPOWERMENT_CATEGORY && resource.is_launchable()
            }
            CatalogView::Empowerment => resource.category == EMPOWERMENT_CATEGORY,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub view: CatalogView,
    /// `None` or `all` keeps every category
    pub category: Option<FilterOption>,
    pub grade: Option<FilterOption>,
    pub query: String,
}

impl CatalogFilter {
    pub fn new(view: CatalogView) -> Self {
        Self {
            view,
            ..Default::default()
        }
    }

    pub fn category(mut self, category: FilterOption) -> Self {
        self.category = Some(category);
        self
    }

    pub fn grade(mut self, grade: FilterOption) -> Self {
        self.grade = Some(grade);
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    fn keeps(&self, resource: &Resource) -> bool {
        if !self.view.includes(resource) {
            return false;
        }
        if let Some(category) = self.category.filter(|c| c.id != "all") {
            if resource.category != category.label {
                return false;
            }
        }
        if let Some(grade) = self.grade {
            if !resource.grade.contains(grade.label) && resource.grade != UNIVERSAL_GRADE {
                return false;
            }
        }
        true
    }

    /// Apply the view, category and grade filters, then rank by the query
    /// over title and description.
    pub fn apply(&self, matcher: &SearchMatcher, resources: Vec<Resource>) -> Vec<Ranked<Resource>> {
        let kept: Vec<Resource> = resources.into_iter().filter(|r| self.keeps(r)).collect();
        rank(matcher, kept, &self.query, |r| {
            vec![r.title.as_str(), r.description.as_str()]
        })
    }
}
