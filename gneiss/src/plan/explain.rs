use std::borrow::Cow;
use std::default::Default;
use std::io::{BufWriter, Write};

use ptree::print_config::UTF_CHARS;
use ptree::{write_tree_with, PrintConfig, Style, TreeItem};

use crate::plan::{Plan, PlanNode};

impl<'a> TreeItem for &'a PlanNode {
    type Child = Self;

    fn write_self<W: Write>(&self, f: &mut W, style: &Style) -> std::io::Result<()> {
        let text = format!("{} [{}]", self.operator(), self.traits());
        write!(f, "{}", style.paint(text))
    }

    fn children(&self) -> Cow<[Self::Child]> {
        Cow::from(
            self.inputs()
                .iter()
                .map(|c| &**c)
                .collect::<Vec<&'a PlanNode>>(),
        )
    }
}

pub fn explain<W: Write>(plan: &Plan, output: &mut W) -> std::io::Result<()> {
    let config = PrintConfig {
        indent: 3,
        characters: UTF_CHARS.into(),
        ..Default::default()
    };
    write_tree_with(&&*plan.root(), output, &config)
}

pub fn explain_to_string(plan: &Plan) -> std::io::Result<String> {
    let mut buf = BufWriter::new(Vec::new());

    explain(plan, &mut buf)?;

    let bytes = buf.into_inner()?;
    Ok(String::from_utf8(bytes).unwrap())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow_schema::{DataType, Field, Schema};

    use crate::expr::{col, lit};
    use crate::operator::TableDesc;
    use crate::plan::explain::explain_to_string;
    use crate::plan::LogicalPlanBuilder;

    #[test]
    fn test_explain_plan() {
        let table = Arc::new(TableDesc::new(
            "t1",
            Arc::new(Schema::new(vec![Field::new("c1", DataType::Int64, false)])),
        ));

        let plan = LogicalPlanBuilder::new()
            .scan(table)
            .filter(col("c1").eq(lit(5i64)))
            .limit(10)
            .build()
            .unwrap();

        let expected_result = "\
Limit { fetch: 10 } [NONE, []]
└─ Filter { predicate: c1 = 5 } [NONE, []]
   └─ Scan { table: \"t1\" } [NONE, []]
";

        let result = explain_to_string(&plan).unwrap();

        assert_eq!(expected_result, result);
    }
}
