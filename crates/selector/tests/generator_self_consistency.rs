//! End-to-end guarantees of the generation pipeline on a realistic page:
//! every attached element gets a selector, that selector resolves back to
//! its element, survives sanitization unchanged, and never leans on
//! machine-generated tokens.

use pagemark_dom::{parse_html, DocumentQuery};
use pagemark_selector::{confidence, is_dynamic_token, parse, sanitize, SelectorGenerator};

const STORE_PAGE: &str = r#"
<html lang="en">
<body>
  <header id="ember42" class="css-8fk2ld site-header">
    <nav aria-label="Main">
      <a href="/">Home</a>
      <a href="/cart" data-testid="cart-link">Cart</a>
    </nav>
  </header>
  <main>
    <section class="catalog">
      <article class="product featured" id="prod-chair">
        <h2>Chair</h2>
        <button class="css-19xq2o buy">Add to cart</button>
      </article>
      <article class="product">
        <h2>Desk</h2>
        <button class="css-77aa1b buy">Add to cart</button>
      </article>
      <article class="product">
        <h2>Lamp</h2>
        <button class="buy" data-qa="buy-lamp">Add to cart</button>
      </article>
    </section>
    <aside>
      <ul id="123456">
        <li>Recently viewed</li>
        <li>Saved for later</li>
      </ul>
    </aside>
  </main>
</body>
</html>
"#;

#[test]
fn every_element_is_anchorable_and_round_trips() {
    let doc = parse_html(STORE_PAGE);
    let generator = SelectorGenerator::default();
    for target in doc.all_elements() {
        let selector = generator
            .generate(&doc, target)
            .expect("attached elements always get a selector");

        let matches = doc.query_selector_all(&selector).expect("valid syntax");
        assert_eq!(matches, vec![target], "{selector:?} must resolve uniquely");

        // Sanitization never invalidates generator output.
        assert_eq!(sanitize(&selector), Some(selector.clone()));

        // No strategy may smuggle in a churned token.
        let parts = parse(&selector);
        if let Some(id) = &parts.id {
            assert!(!is_dynamic_token(id), "{selector:?} uses dynamic id");
        }
        for class in &parts.classes {
            assert!(!is_dynamic_token(class), "{selector:?} uses dynamic class");
        }
    }
}

#[test]
fn churned_markup_is_routed_around() {
    let doc = parse_html(STORE_PAGE);
    let generator = SelectorGenerator::default();

    // Header id is an ember counter; the stable class wins instead.
    let header = doc.elements_by_tag("header")[0];
    let selector = generator.generate(&doc, header).unwrap();
    assert_eq!(selector, ".site-header");

    // Numeric list id is skipped; the list is reachable structurally.
    let list = doc.query_selector_all("aside ul").unwrap()[0];
    let selector = generator.generate(&doc, list).unwrap();
    assert!(!selector.contains("123456"), "numeric id used in {selector:?}");
    assert_eq!(doc.query_selector_all(&selector).unwrap(), vec![list]);

    // Test hooks are preferred over everything else on the cart link.
    let cart = doc.query_selector_all("[data-testid]").unwrap()[0];
    let selector = generator.generate(&doc, cart).unwrap();
    assert_eq!(selector, "[data-testid=\"cart-link\"]");
}

#[test]
fn advisory_confidence_tracks_strategy_quality() {
    let doc = parse_html(STORE_PAGE);
    let generator = SelectorGenerator::default();

    let cart = doc.query_selector_all("[data-testid]").unwrap()[0];
    let chair = doc.query_selector_all("#prod-chair").unwrap()[0];
    let lamp_heading = doc.query_selector_all("article:nth-of-type(3) > h2").unwrap()[0];

    let attr_selector = generator.generate(&doc, cart).unwrap();
    let id_selector = generator.generate(&doc, chair).unwrap();
    let path_selector = generator.generate(&doc, lamp_heading).unwrap();

    assert!(confidence(&attr_selector) > confidence(&id_selector));
    assert!(confidence(&id_selector) > confidence(&path_selector));
}
