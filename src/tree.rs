use std::collections::BTreeMap;

use crate::config::EngineConfig;
use crate::eligibility::is_weaning_eligible;
use crate::hierarchy::HierarchyResolver;
use crate::models::{Level, PerformanceNode, RawRecord, ScoreCard, Scope};
use crate::normalize::{self, SchoolScoreCard};

// Keyed by slug; the first spelling seen is displayed.
struct Bucket<T> {
    name: String,
    inner: T,
}

type SubCountyBuckets = BTreeMap<String, Bucket<Vec<PerformanceNode>>>;
type DistrictBuckets = BTreeMap<String, Bucket<SubCountyBuckets>>;
type RegionBuckets = BTreeMap<String, Bucket<DistrictBuckets>>;

fn bucket<T: Default>(buckets: &mut BTreeMap<String, Bucket<T>>, name: String) -> &mut T {
    &mut buckets
        .entry(slug(&name))
        .or_insert_with(|| Bucket {
            name,
            inner: T::default(),
        })
        .inner
}

pub fn build_tree(
    records: &[RawRecord],
    resolver: &HierarchyResolver,
    config: &EngineConfig,
) -> PerformanceNode {
    let cards = normalize::latest_score_cards(records, config.scorecard_max);
    tracing::debug!(schools = cards.len(), "building performance tree");
    build_from_cards(cards.into_values(), resolver, config.weaning_threshold)
}

pub fn build_from_cards(
    cards: impl IntoIterator<Item = SchoolScoreCard>,
    resolver: &HierarchyResolver,
    weaning_threshold: f64,
) -> PerformanceNode {
    let mut regions: RegionBuckets = BTreeMap::new();
    let mut unmapped = 0usize;
    for school in cards {
        if !resolver.is_known_district(&school.district) {
            unmapped += 1;
        }
        let (region, district, sub_county) =
            resolver.resolve(&school.district, school.sub_county.as_deref());
        let districts = bucket(&mut regions, region);
        let sub_counties = bucket(districts, district);
        bucket(sub_counties, sub_county).push(school_node(school, weaning_threshold));
    }
    if unmapped > 0 {
        tracing::warn!(
            schools = unmapped,
            "schools placed under an unknown region; district missing from the lookup table"
        );
    }

    let region_nodes = regions
        .into_values()
        .map(|Bucket { name: region, inner: districts }| {
            let district_nodes = districts
                .into_values()
                .map(|Bucket { name: district, inner: sub_counties }| {
                    let sub_county_nodes = sub_counties
                        .into_values()
                        .map(|Bucket { name: sub_county, inner: schools }| {
                            let id = format!("sub-county:{}/{}", slug(&district), slug(&sub_county));
                            parent_node(id, sub_county, Level::SubCounty, schools)
                        })
                        .collect();
                    let id = format!("district:{}", slug(&district));
                    parent_node(id, district, Level::District, sub_county_nodes)
                })
                .collect();
            let id = format!("region:{}", slug(&region));
            parent_node(id, region, Level::Region, district_nodes)
        })
        .collect();

    let country = resolver.country().to_string();
    parent_node(
        format!("country:{}", slug(&country)),
        country,
        Level::Country,
        region_nodes,
    )
}

pub fn profile<'a>(tree: &'a PerformanceNode, scope: &Scope) -> Option<&'a PerformanceNode> {
    if scope.level == Level::Country {
        return Some(tree);
    }
    tree.find(scope.level, &scope.name)
}

fn school_node(school: SchoolScoreCard, weaning_threshold: f64) -> PerformanceNode {
    PerformanceNode {
        id: school.school_id,
        name: school.school_name,
        level: Level::School,
        weaning_eligible: Some(is_weaning_eligible(&school.card, weaning_threshold)),
        scores: school.card,
        children: Vec::new(),
        school_count: 1,
    }
}

fn parent_node(
    id: String,
    name: String,
    level: Level,
    mut children: Vec<PerformanceNode>,
) -> PerformanceNode {
    children.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
    PerformanceNode {
        id,
        name,
        level,
        scores: ScoreCard::mean(children.iter().map(|child| &child.scores)),
        school_count: children.iter().map(|child| child.school_count).sum(),
        children,
        weaning_eligible: None,
    }
}

fn slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::*;
    use crate::hierarchy::{UNKNOWN_REGION, UNKNOWN_SUB_COUNTY};
    use crate::models::{ActivityModule, Payload};

    fn scorecard_record(school: &str, district: &str, sub_county: &str, dims: [f64; 5]) -> RawRecord {
        let mut payload = serde_json::json!({
            "school_name": school,
            "instruction": dims[0],
            "outcomes": dims[1],
            "leadership": dims[2],
            "community": dims[3],
            "environment": dims[4],
        });
        if !sub_county.is_empty() {
            payload["sub_county"] = serde_json::Value::String(sub_county.into());
        }
        RawRecord {
            id: Uuid::new_v4(),
            module: ActivityModule::Assessment,
            school_id: format!("id-{school}"),
            district: district.into(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            status: "completed".into(),
            payload: serde_json::from_value::<Payload>(payload).unwrap(),
        }
    }

    fn build(records: &[RawRecord]) -> PerformanceNode {
        let config = EngineConfig::default();
        build_tree(records, &HierarchyResolver::new(&config), &config)
    }

    fn assert_parent_is_child_mean(node: &PerformanceNode) {
        if node.level == Level::School {
            assert_eq!(node.school_count, 1);
            return;
        }
        let expected = ScoreCard::mean(node.children.iter().map(|c| &c.scores));
        for (actual, expected) in node.scores.dimensions().iter().zip(expected.dimensions()) {
            assert!((actual - expected).abs() < 1e-9, "{} scores drifted", node.id);
        }
        let schools: usize = node.children.iter().map(|c| c.school_count).sum();
        assert_eq!(node.school_count, schools);
        node.children.iter().for_each(assert_parent_is_child_mean);
    }

    #[test]
    fn sub_county_averages_its_schools() {
        let records = vec![
            scorecard_record("Awach P7", "Gulu", "Bardege", [8.0; 5]),
            scorecard_record("Bobi Primary", "Gulu", "Bardege", [6.0, 7.0, 6.0, 5.0, 6.0]),
            scorecard_record("Coorom School", "Gulu", "Bardege", [9.0; 5]),
        ];
        let tree = build(&records);
        let sub_county = tree.find(Level::SubCounty, "Bardege").unwrap();

        let expected = [23.0 / 3.0, 8.0, 23.0 / 3.0, 22.0 / 3.0, 23.0 / 3.0];
        for (actual, expected) in sub_county.scores.dimensions().iter().zip(expected) {
            assert!((actual - expected).abs() < 1e-9);
        }
        assert_eq!(sub_county.school_count, 3);
        assert_eq!(tree.school_count, 3);

        let eligible: Vec<&str> = sub_county
            .children
            .iter()
            .filter(|school| school.weaning_eligible == Some(true))
            .map(|school| school.name.as_str())
            .collect();
        // Awach sits exactly on the 8.0 bar, which clears it.
        assert_eq!(eligible, vec!["Awach P7", "Coorom School"]);
        assert_eq!(sub_county.children[1].weaning_eligible, Some(false));
    }

    #[test]
    fn every_parent_is_the_mean_of_its_children() {
        let records = vec![
            scorecard_record("A", "Gulu", "Bardege", [8.0, 7.0, 6.0, 5.0, 4.0]),
            scorecard_record("B", "Gulu", "Laroo", [2.0; 5]),
            scorecard_record("C", "Gulu", "Laroo", [4.0; 5]),
            scorecard_record("D", "Lira", "Adyel", [9.0; 5]),
            scorecard_record("E", "Kampala", "Nakawa", [5.0; 5]),
            scorecard_record("F", "Mbale", "", [3.0; 5]),
        ];
        let tree = build(&records);
        assert_parent_is_child_mean(&tree);

        // Regions are averaged from districts, not pooled from schools.
        let northern = tree.find(Level::Region, "Northern").unwrap();
        assert_eq!(northern.school_count, 4);
        assert!((northern.scores.community - 6.5).abs() < 1e-9);
    }

    #[test]
    fn spellings_differing_in_case_share_one_node() {
        let records = vec![
            scorecard_record("Awach P7", "Gulu", "Bardege", [8.0; 5]),
            scorecard_record("Bobi Primary", "gulu", "bardege ", [6.0; 5]),
            scorecard_record("Lost", "Atlantis", "", [5.0; 5]),
            scorecard_record("Found", "ATLANTIS", "", [3.0; 5]),
        ];
        let tree = build(&records);
        assert_parent_is_child_mean(&tree);

        let gulu = tree.find(Level::District, "Gulu").unwrap();
        assert_eq!(gulu.children.len(), 1);
        assert_eq!(gulu.children[0].id, "sub-county:gulu/bardege");
        assert_eq!(gulu.children[0].school_count, 2);
        assert!((gulu.scores.instruction - 7.0).abs() < 1e-9);

        let unknown = tree.find(Level::Region, UNKNOWN_REGION).unwrap();
        assert_eq!(unknown.children.len(), 1);
        assert_eq!(unknown.children[0].school_count, 2);
    }

    #[test]
    fn children_sort_alphabetically() {
        let records = vec![
            scorecard_record("zeta", "Gulu", "Laroo", [1.0; 5]),
            scorecard_record("Alpha", "Gulu", "Laroo", [1.0; 5]),
            scorecard_record("mid", "Gulu", "Laroo", [1.0; 5]),
        ];
        let tree = build(&records);
        let names: Vec<&str> = tree
            .find(Level::SubCounty, "Laroo")
            .unwrap()
            .children
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Alpha", "mid", "zeta"]);
    }

    #[test]
    fn empty_snapshot_yields_a_no_data_root() {
        let tree = build(&[]);
        assert_eq!(tree.level, Level::Country);
        assert_eq!(tree.school_count, 0);
        assert_eq!(tree.scores, ScoreCard::default());
        assert!(!tree.has_data());
    }

    #[test]
    fn unknown_hierarchy_becomes_a_bucket() {
        let records = vec![scorecard_record("Lost", "Atlantis", "", [5.0; 5])];
        let tree = build(&records);
        let region = tree.find(Level::Region, UNKNOWN_REGION).unwrap();
        assert_eq!(region.school_count, 1);
        assert!(tree.find(Level::SubCounty, UNKNOWN_SUB_COUNTY).is_some());
    }

    #[test]
    fn profile_finds_scoped_node() {
        let records = vec![scorecard_record("Awach P7", "Gulu", "Bardege", [8.0; 5])];
        let tree = build(&records);
        let node = profile(&tree, &Scope::new(Level::School, "id-Awach P7")).unwrap();
        assert_eq!(node.weaning_eligible, Some(true));
        assert!(profile(&tree, &Scope::new(Level::District, "Lira")).is_none());
    }
}
