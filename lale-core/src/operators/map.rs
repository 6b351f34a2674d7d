//! Stateless transformer computing columns from [`Expr`]s.

use std::sync::LazyLock;

use crate::data::{Frame, Labels};
use crate::error::Result;
use crate::expr::{Expr, eval};
use crate::operator::{Trainable, Trained};
use crate::schema::{CellShape, DataShape, DataStage, OperatorDescriptor, Tags};

static DESCRIPTOR: LazyLock<OperatorDescriptor> = LazyLock::new(|| {
    let features = DataShape::Features {
        cells: CellShape::Any,
        labels: None,
    };
    OperatorDescriptor::new("Map", "Relational algebra map operator.")
        .documentation_url("https://github.com/IBM/lale")
        .tags(Tags::op(["transformer"]))
        .data(DataStage::InputFit, features.clone())
        .data(DataStage::InputTransform, features.clone())
        .data(DataStage::OutputTransform, features)
});

/// Input columns not named by any expression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MapRemainder {
    #[default]
    Drop,
    Passthrough,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Map {
    columns: Vec<(String, Expr)>,
    remainder: MapRemainder,
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn descriptor() -> &'static OperatorDescriptor {
        &DESCRIPTOR
    }

    pub fn column(mut self, name: impl Into<String>, expr: Expr) -> Self {
        self.columns.push((name.into(), expr));
        self
    }

    pub fn remainder(mut self, remainder: MapRemainder) -> Self {
        self.remainder = remainder;
        self
    }

    /// Computed columns follow the passed-through ones, in declaration order.
    pub fn apply(&self, x: &Frame) -> Result<Frame> {
        let mut out = match self.remainder {
            MapRemainder::Passthrough => {
                let replaced: Vec<usize> = (0..x.column_count())
                    .filter(|&i| self.columns.iter().any(|(name, _)| *name == x.columns()[i]))
                    .collect();
                x.drop_columns(&replaced)
            }
            MapRemainder::Drop => Frame::new(Vec::new(), vec![Vec::new(); x.row_count()])?,
        };
        for (name, expr) in &self.columns {
            out.push_column(name.clone(), eval(x, expr)?)?;
        }
        Ok(out)
    }
}

impl Trainable for Map {
    fn name(&self) -> &str {
        "Map"
    }

    fn fit(&self, x: &Frame, _y: Option<&Labels>) -> Result<Box<dyn Trained>> {
        DESCRIPTOR.check_input(DataStage::InputFit, x, None)?;
        tracing::debug!(columns = self.columns.len(), "Fitted Map");
        Ok(Box::new(self.clone()))
    }
}

impl Trained for Map {
    fn name(&self) -> &str {
        "Map"
    }

    fn transform(&self, x: &Frame) -> Result<Frame> {
        self.apply(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{DatePart, HandleUnknown};
    use crate::operator::Pipeline;
    use crate::operators::KeepNumbers;
    use serde_json::json;

    fn orders() -> Frame {
        Frame::new(
            vec!["price".into(), "qty".into(), "placed".into(), "size".into()],
            vec![
                vec![json!(2.5), json!(4), json!("2021-03-04 10:15:00"), json!("S")],
                vec![json!(10), json!(1), json!("2021-03-06 18:40:00"), json!("XL")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_drops_remainder_by_default() {
        let map = Map::new()
            .column("total", Expr::col("price") * Expr::col("qty"))
            .column("weekday", Expr::col("placed").date_part(DatePart::DayOfWeek, None));
        let out = map.fit(&orders(), None).unwrap().transform(&orders()).unwrap();
        assert_eq!(out.columns(), &["total".to_string(), "weekday".to_string()]);
        assert_eq!(out.rows()[0], vec![json!(10.0), json!(3)]);
        assert_eq!(out.rows()[1], vec![json!(10), json!(5)]);
    }

    #[test]
    fn test_passthrough_replaces_named_columns() {
        let map = Map::new()
            .column(
                "size",
                Expr::col("size").replace(
                    [(json!("S"), json!(0)), (json!("M"), json!(1))],
                    HandleUnknown::UseEncodedValue(json!(-1)),
                ),
            )
            .remainder(MapRemainder::Passthrough);
        let out = map.apply(&orders()).unwrap();
        assert_eq!(
            out.columns(),
            &["price".to_string(), "qty".to_string(), "placed".to_string(), "size".to_string()]
        );
        assert_eq!(
            out.column_values(3).cloned().collect::<Vec<_>>(),
            vec![json!(0), json!(-1)]
        );
    }

    #[test]
    fn test_in_pipeline_before_keep_numbers() {
        let map = Map::new()
            .column("hour", Expr::col("placed").date_part(DatePart::Hour, None))
            .remainder(MapRemainder::Passthrough);
        let trained = Pipeline::new()
            .step(map)
            .step(KeepNumbers)
            .fit(&orders(), None)
            .unwrap();
        let out = trained.transform(&orders()).unwrap();
        assert_eq!(
            out.columns(),
            &["price".to_string(), "qty".to_string(), "hour".to_string()]
        );
        assert_eq!(out.rows()[1], vec![json!(10), json!(1), json!(18)]);
    }

    #[test]
    fn test_errors_surface_at_transform() {
        let map = Map::new().column("bad", Expr::col("size") - Expr::lit(1));
        assert!(map.apply(&orders()).is_err());
        let missing = Map::new().column("x", Expr::col("nope"));
        assert!(missing.apply(&orders()).is_err());
    }
}
