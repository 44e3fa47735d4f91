//! Site-builder pages and virtual system pages.
//!
//! A merchant's pages are stored by the backend. Some routes (home, cart,
//! checkout, ...) must always render even before the merchant has designed
//! them, so for those "system" slugs a placeholder page is synthesised in
//! memory. A virtual page has no ID and is never written back until the
//! merchant explicitly opens it in the page designer.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::types::{Language, PageId, StoreType};

/// Slugs that always resolve to a page, real or virtual.
pub const SYSTEM_SLUGS: &[&str] = &[
    "home",
    "about",
    "contact",
    "cart",
    "checkout",
    "products",
    "categories",
    "account",
    "faq",
    "privacy-policy",
    "terms",
];

/// Whether `slug` is one of the [`SYSTEM_SLUGS`].
#[must_use]
pub fn is_system_slug(slug: &str) -> bool {
    SYSTEM_SLUGS.contains(&slug)
}

/// A single block on a page, rendered by the client's section registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Stable identifier within the page.
    pub id: String,
    /// Section component name, e.g. `hero` or `product-grid`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-form component properties.
    #[serde(default)]
    pub props: Value,
}

/// Ordered section list of a page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageContent {
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// A storefront page, either persisted or virtual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Backend ID; `None` for virtual pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PageId>,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub content: PageContent,
    #[serde(default)]
    pub is_published: bool,
    /// Set only on pages synthesised by [`virtual_page`].
    #[serde(default)]
    pub is_virtual: bool,
}

/// Synthesise placeholder content for a system slug.
///
/// Returns `None` for slugs outside [`SYSTEM_SLUGS`].
#[must_use]
pub fn virtual_page(slug: &str, store_type: StoreType, language: Language) -> Option<Page> {
    if !is_system_slug(slug) {
        return None;
    }

    let t = |ar: &'static str, en: &'static str| match language {
        Language::Ar => ar,
        Language::En => en,
    };
    let digital = store_type == StoreType::Digital;

    let (title, sections) = match slug {
        "home" => (
            t("الرئيسية", "Home"),
            vec![
                section(
                    "hero",
                    "hero",
                    json!({
                        "title": if digital {
                            t("بطاقات رقمية فورية", "Instant digital cards")
                        } else {
                            t("مرحباً بك في متجرنا", "Welcome to our store")
                        },
                        "subtitle": if digital {
                            t("استلم طلبك خلال ثوانٍ", "Receive your order within seconds")
                        } else {
                            t("أفضل المنتجات بأفضل الأسعار", "The best products at the best prices")
                        },
                        "ctaLabel": t("تسوق الآن", "Shop now"),
                        "ctaHref": "/products",
                    }),
                ),
                section(
                    "categories",
                    "category-grid",
                    json!({ "title": t("الأقسام", "Categories"), "limit": 8 }),
                ),
                section(
                    "featured",
                    "product-grid",
                    json!({
                        "title": t("منتجات مميزة", "Featured products"),
                        "source": "featured",
                        "limit": 8,
                    }),
                ),
            ],
        ),
        "about" => (
            t("من نحن", "About us"),
            vec![section(
                "about",
                "rich-text",
                json!({
                    "heading": t("من نحن", "About us"),
                    "body": if digital {
                        t(
                            "نوفر البطاقات والأكواد الرقمية مع تسليم فوري وآمن.",
                            "We provide digital cards and codes with instant, secure delivery.",
                        )
                    } else {
                        t(
                            "نقدم منتجات مختارة بعناية مع توصيل سريع وخدمة عملاء متميزة.",
                            "We offer carefully selected products with fast delivery and great support.",
                        )
                    },
                }),
            )],
        ),
        "contact" => (
            t("تواصل معنا", "Contact us"),
            vec![section(
                "contact",
                "contact-form",
                json!({
                    "heading": t("تواصل معنا", "Contact us"),
                    "fields": ["name", "email", "message"],
                }),
            )],
        ),
        "cart" => (
            t("سلة التسوق", "Cart"),
            vec![section("cart", "cart", json!({ "showCoupon": true }))],
        ),
        "checkout" => (
            t("إتمام الطلب", "Checkout"),
            vec![section(
                "checkout",
                "checkout",
                json!({ "requireShipping": !digital }),
            )],
        ),
        "products" => (
            t("المنتجات", "Products"),
            vec![section(
                "products",
                "product-grid",
                json!({ "source": "all", "paginate": true, "showFilters": true }),
            )],
        ),
        "categories" => (
            t("الأقسام", "Categories"),
            vec![section("categories", "category-grid", json!({ "limit": 0 }))],
        ),
        "account" => (
            t("حسابي", "My account"),
            vec![section(
                "account",
                "account",
                json!({ "tabs": if digital { json!(["orders", "codes", "profile"]) } else { json!(["orders", "addresses", "profile"]) } }),
            )],
        ),
        "faq" => (
            t("الأسئلة الشائعة", "FAQ"),
            vec![section(
                "faq",
                "faq",
                json!({
                    "items": [
                        {
                            "question": t("كم يستغرق التوصيل؟", "How long does delivery take?"),
                            "answer": if digital {
                                t("يتم التسليم فوراً بعد الدفع.", "Delivery is instant after payment.")
                            } else {
                                t("من ٢ إلى ٥ أيام عمل.", "2 to 5 business days.")
                            },
                        },
                        {
                            "question": t("ما هي طرق الدفع المتاحة؟", "Which payment methods are available?"),
                            "answer": t("جميع البطاقات الرئيسية.", "All major cards."),
                        },
                    ],
                }),
            )],
        ),
        "privacy-policy" => (
            t("سياسة الخصوصية", "Privacy policy"),
            vec![section(
                "privacy",
                "rich-text",
                json!({
                    "heading": t("سياسة الخصوصية", "Privacy policy"),
                    "body": t(
                        "نحترم خصوصيتك ولا نشارك بياناتك مع أي طرف ثالث.",
                        "We respect your privacy and never share your data with third parties.",
                    ),
                }),
            )],
        ),
        _ => (
            t("الشروط والأحكام", "Terms and conditions"),
            vec![section(
                "terms",
                "rich-text",
                json!({
                    "heading": t("الشروط والأحكام", "Terms and conditions"),
                    "body": t(
                        "باستخدامك لهذا المتجر فإنك توافق على الشروط والأحكام.",
                        "By using this store you agree to its terms and conditions.",
                    ),
                }),
            )],
        ),
    };

    Some(Page {
        id: None,
        slug: slug.to_owned(),
        title: title.to_owned(),
        content: PageContent { sections },
        is_published: true,
        is_virtual: true,
    })
}

fn section(id: &str, kind: &str, props: Value) -> Section {
    Section {
        id: id.to_owned(),
        kind: kind.to_owned(),
        props,
    }
}
