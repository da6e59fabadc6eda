//! Serialized computation graph for one year's sample table.
//!
//! The graph mirrors the interactive workflow: load the monthly collection,
//! keep the images whose `system:time_start` falls in the year, average them,
//! select the radiance band, clip to the region, then sample the result at
//! seeded random points inside the same region.

use crate::domain::model::{
    BoundingBox, DateRange, Expression, FunctionInvocation, SamplingParams, ValueNode,
};
use serde_json::json;
use std::collections::BTreeMap;

pub fn constant(value: serde_json::Value) -> ValueNode {
    ValueNode::ConstantValue(value)
}

pub fn invoke<I, K>(function_name: &str, arguments: I) -> ValueNode
where
    I: IntoIterator<Item = (K, ValueNode)>,
    K: Into<String>,
{
    ValueNode::FunctionInvocationValue(FunctionInvocation {
        function_name: function_name.to_string(),
        arguments: arguments.into_iter().map(|(k, v)| (k.into(), v)).collect(),
    })
}

/// Collects shared nodes so a subgraph used twice is serialized once.
#[derive(Debug, Default)]
pub struct ExpressionBuilder {
    values: BTreeMap<String, ValueNode>,
    next_id: usize,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `node` and returns a reference to it.
    pub fn bind(&mut self, node: ValueNode) -> ValueNode {
        let id = self.next_id.to_string();
        self.next_id += 1;
        self.values.insert(id.clone(), node);
        ValueNode::ValueReference(id)
    }

    pub fn finish(mut self, root: ValueNode) -> Expression {
        let result = self.next_id.to_string();
        self.values.insert(result.clone(), root);
        Expression {
            result,
            values: self.values,
        }
    }
}

pub fn rectangle(region: &BoundingBox) -> ValueNode {
    invoke(
        "GeometryConstructors.Rectangle",
        [
            ("coordinates", constant(json!(region.corners()))),
            ("geodesic", constant(json!(false))),
        ],
    )
}

fn date(millis: i64) -> ValueNode {
    invoke("Date", [("value", constant(json!(millis)))])
}

pub fn annual_mean_image(
    collection_id: &str,
    band: &str,
    dates: &DateRange,
    region: ValueNode,
) -> ValueNode {
    let collection = invoke("ImageCollection.load", [("id", constant(json!(collection_id)))]);

    let date_range = invoke(
        "DateRange",
        [
            ("start", date(dates.start_millis())),
            ("end", date(dates.end_millis())),
        ],
    );
    let filter = invoke(
        "Filter.dateRangeContains",
        [
            ("leftValue", date_range),
            ("rightField", constant(json!("system:time_start"))),
        ],
    );
    let filtered = invoke(
        "Collection.filter",
        [("collection", collection), ("filter", filter)],
    );

    let mean = invoke("reduce.mean", [("collection", filtered)]);
    let selected = invoke(
        "Image.select",
        [
            ("input", mean),
            (
                "bandSelectors",
                ValueNode::ArrayValue {
                    values: vec![constant(json!(band))],
                },
            ),
        ],
    );
    invoke("Image.clip", [("input", selected), ("geometry", region)])
}

pub fn random_points(region: ValueNode, points: u64, seed: i64) -> ValueNode {
    invoke(
        "FeatureCollection.randomPoints",
        [
            ("region", region),
            ("points", constant(json!(points))),
            ("seed", constant(json!(seed))),
        ],
    )
}

pub fn sample_regions(image: ValueNode, points: ValueNode, sampling: &SamplingParams) -> ValueNode {
    invoke(
        "Image.sampleRegions",
        [
            ("image", image),
            ("collection", points),
            ("scale", constant(json!(sampling.scale))),
            ("geometries", constant(json!(sampling.geometries))),
        ],
    )
}

/// Full per-year graph: the region rectangle is bound once and referenced by
/// both the clip and the point draw.
pub fn yearly_samples(
    region: &BoundingBox,
    collection_id: &str,
    band: &str,
    dates: &DateRange,
    seed: i64,
    sampling: &SamplingParams,
) -> Expression {
    let mut builder = ExpressionBuilder::new();
    let geometry = builder.bind(rectangle(region));

    let image = annual_mean_image(collection_id, band, dates, geometry.clone());
    let points = random_points(geometry, sampling.points, seed);

    builder.finish(sample_regions(image, points, sampling))
}
