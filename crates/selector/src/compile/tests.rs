use super::*;

fn single(source: &str) -> Selector {
    let mut selectors = compile(source).expect("compiles");
    assert_eq!(selectors.len(), 1, "{source}");
    selectors.remove(0)
}

fn error(source: &str) -> CompileError {
    compile(source).expect_err("should fail")
}

#[test]
fn chain_with_combinators() {
    let selector = single("html body > ul + li ~ p { delete(); }");
    let combinators: Vec<Combinator> = selector
        .components()
        .iter()
        .map(Component::combinator)
        .collect();
    assert_eq!(
        combinators,
        [
            Combinator::Root,
            Combinator::Descendant,
            Combinator::Child,
            Combinator::Adjacent,
            Combinator::Sibling,
        ]
    );
    assert_eq!(
        selector.components()[4].tag(),
        &TagPredicate::Named("p".to_string())
    );
    assert_eq!(selector.actions().len(), 1);
    assert_eq!(selector.actions()[0].function(), "delete");
}

#[test]
fn id_class_and_attributes() {
    let selector = single(r#"A#main.btn[data-x^="a b"][hidden][rel|=nofollow] {}"#);
    let component = &selector.components()[0];
    assert_eq!(component.tag(), &TagPredicate::Named("a".to_string()));
    let attributes: Vec<(&str, Comparator, &str)> = component
        .attributes()
        .iter()
        .map(|a| (a.name(), a.comparator(), a.value()))
        .collect();
    assert_eq!(
        attributes,
        [
            ("id", Comparator::Equals, "main"),
            ("class", Comparator::Includes, "btn"),
            ("data-x", Comparator::Prefix, "a b"),
            ("hidden", Comparator::Exists, ""),
            ("rel", Comparator::DashMatch, "nofollow"),
        ]
    );
}

#[test]
fn pseudo_classes() {
    let selector = single("li:nth-child( -n + 3 ):start(2):count(4):after { print(); }");
    assert_eq!(selector.components()[0].nth(), NthChild::new(-1, 3));
    assert_eq!(selector.start(), 2);
    assert_eq!(selector.count(), 4);
    assert_eq!(selector.placement(), Placement::After);

    assert_eq!(single("p:first-child{}").components()[0].nth(), NthChild::FIRST);
    assert_eq!(single(":before{}").placement(), Placement::Before);
}

#[test]
fn nth_arguments() {
    assert_eq!(parse_nth("odd"), Some(NthChild::ODD));
    assert_eq!(parse_nth("EVEN"), Some(NthChild::EVEN));
    assert_eq!(parse_nth("2n+1"), Some(NthChild::new(2, 1)));
    assert_eq!(parse_nth("2n - 1"), Some(NthChild::new(2, -1)));
    assert_eq!(parse_nth("n"), Some(NthChild::new(1, 0)));
    assert_eq!(parse_nth("5"), Some(NthChild::new(0, 5)));
    assert_eq!(parse_nth("x"), None);
    assert_eq!(parse_nth("2n+"), None);
}

#[test]
fn groups_share_actions() {
    let selectors = compile("h1, h2 , comment { addAttribute(id, 'top'); done }").unwrap();
    assert_eq!(selectors.len(), 3);
    assert_eq!(selectors[2].components()[0].tag(), &TagPredicate::Comment);
    for selector in &selectors {
        let names: Vec<String> = selector.actions().iter().map(ToString::to_string).collect();
        assert_eq!(names, ["addAttribute(id, top)", "done()"]);
    }
}

#[test]
fn arguments_and_qualified_names() {
    let selector = single(r#"p { site.util.stamp("a, b", 'it\'s' , bare words ); }"#);
    let action = &selector.actions()[0];
    assert_eq!(action.library(), "site.util");
    assert_eq!(action.function(), "stamp");
    assert_eq!(action.arguments(), ["a, b", "it's", "bare words"]);
}

#[test]
fn comments_and_lines() {
    let source = "/* header\n   comment */\np { delete(); }\n\n/* x */ div\n{ print(); }\n";
    let selectors = compile(source).unwrap();
    assert_eq!(selectors.len(), 2);
    assert_eq!(selectors[0].line(), 3);
    assert_eq!(selectors[1].line(), 5);
}

#[test]
fn errors_carry_lines() {
    assert_eq!(
        error("p {}\ndiv >> a {}"),
        CompileError {
            line: 2,
            kind: CompileErrorKind::UnexpectedChar('>'),
        }
    );
    assert_eq!(error("p { delete();").kind, CompileErrorKind::UnexpectedEnd);
    assert_eq!(error("p[title=\"x] {}").kind, CompileErrorKind::UnterminatedString);
    assert_eq!(error("/* open").kind, CompileErrorKind::UnterminatedComment);
    assert_eq!(error(", p {}").kind, CompileErrorKind::MissingSelector);
    assert_eq!(error("p[a!=b] {}").kind, CompileErrorKind::UnexpectedChar('!'));
    assert_eq!(
        error("p[a~~b] {}").kind,
        CompileErrorKind::UnknownComparator("~~".to_string())
    );
    assert_eq!(
        error("p:hover {}").kind,
        CompileErrorKind::UnknownPseudo("hover".to_string())
    );
    assert_eq!(
        error("p:count(x) {}").kind,
        CompileErrorKind::BadPseudoArgument {
            pseudo: "count".to_string(),
            argument: "x".to_string(),
        }
    );
    assert_eq!(error("p:before:after {}").kind, CompileErrorKind::ConflictingPlacement);
    assert_eq!(error("p { (x); }").kind, CompileErrorKind::EmptyActionName);
    assert_eq!(error("p { delete() print() }").kind, CompileErrorKind::UnexpectedChar('p'));
    assert_eq!(
        error("p\n{ x }\nq").to_string(),
        "line 3: unexpected end of input"
    );
}
