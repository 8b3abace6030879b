//! Selector tables for the vendor dashboard, one ordered candidate list per
//! logical target. The markup is unstable and undocumented; keeping the
//! fallbacks as data here keeps the vendor coupling in one place.

use super::locate::Candidate::{self, Css, CssWithText, XPath};

// Login page
pub const LOGIN_USERNAME: &[Candidate] = &[Css("input#emailAddress")];
pub const LOGIN_PASSWORD: &[Candidate] = &[Css("input#password")];
pub const LOGIN_SUBMIT: &[Candidate] = &[
    XPath("//button[normalize-space()='Login']"),
    Css("button[label='Login']"),
    CssWithText("button.form__button", "Login"),
    Css("button[type='submit']"),
];

// Left menu / course navigation
pub const COURSES_TOOL: &[Candidate] = &[
    Css("div.left-menu li[ptooltip='Courses']"),
    Css("div.left-menu li.each-tool[ptooltip='Courses']"),
    Css("div.left-menu li[ptooltip='Courses'] span.icon-learning"),
    CssWithText("div.left-menu li", "Courses"),
];
pub const COURSE_SEARCH: &[Candidate] =
    &[Css("input[placeholder='Enter course name to search']")];
pub const COURSE_RESULT_ROWS: &str = "tbody.ui-datatable-data tr";
pub const COURSE_ROW_FALLBACKS: &[Candidate] = &[
    Css("tbody.ui-datatable-data tr.ui-datatable-even"),
    Css("tbody.ui-datatable-data tr"),
];
pub const MODULE_ENTRIES: &str = "div.ui-g-3.sidedivpre span.modulelist";
pub const TEST_CARDS: &str = "div.ui-g-9.maindivpre div.ui-g-12.moduletest";
pub const TEST_COMPLETED_COUNTER: &str =
    "div.confirmModal.st-count span.meta-data.ui-g-12.ui-g-nopad";

// Report generation (performance flow)
pub const RESULTS_CHECKBOX: &[Candidate] =
    &[Css("div.ui-chkbox-box.ui-widget.ui-corner-all.ui-state-default")];
pub const SELECT_ALL: &[Candidate] = &[CssWithText("span.text-underline", "Select all")];
pub const ACTION_DROPDOWN: &[Candidate] = &[XPath(
    "//label[contains(@class,'ui-dropdown-label') and contains(normalize-space(),'Action')]\
     /ancestor::div[contains(@class,'ui-dropdown')]",
)];
pub const SHAREABLE_LINK_OPTION: &[Candidate] =
    &[Css("li.ui-dropdown-item.ui-corner-all[aria-label='Generate Shareable Link']")];
pub const COMPLETED_MULTISELECT: &[Candidate] =
    &[CssWithText("span.ui-multiselect-label.ui-corner-all", "Completed")];
pub const MULTISELECT_CHECKBOX: &[Candidate] = &[Css(
    "div.ui-multiselect-panel div.ui-chkbox-box.ui-widget.ui-corner-all.ui-state-default",
)];
pub const DOWNLOAD_RESULTS: &[Candidate] = &[CssWithText("span", "Download results")];
pub const EXCEL_FORMAT: &[Candidate] = &[
    CssWithText("label", "Excel (.xlsx)"),
    Css("input[type='radio'][name='downloadFileType'][value='excel']"),
    Css("p-radiobutton[label='Excel (.xlsx)']"),
    XPath(
        "//p-radiobutton[.//label[contains(.,'Excel')]]\
         //span[contains(@class,'ui-radiobutton-icon')]",
    ),
];
pub const DOWNLOAD_BUTTON: &[Candidate] = &[Css("button.download-button")];

// Stacked dialogs left open after a download
pub const DIALOG_CLOSE: &[Candidate] = &[
    Css("a.ui-dialog-titlebar-close span.pi.pi-times"),
    Css("a[class*='ui-dialog-titlebar-close'] span.pi.pi-times"),
    Css("div.ui-dialog-titlebar span.pi.pi-times"),
    Css("span.pi.pi-times"),
];

/// JS fallback when no dialog close control is clickable through WebDriver.
pub const DIALOG_CLOSE_JS: &str = r#"
    let closeSpan = document.querySelector('a.ui-dialog-titlebar-close span.pi.pi-times')
        || document.querySelector('a[class*="ui-dialog-titlebar-close"] span.pi.pi-times')
        || document.querySelector('div.ui-dialog-titlebar span.pi.pi-times')
        || document.querySelector('span.pi.pi-times');
    if (closeSpan) {
        closeSpan.scrollIntoView({ block: 'center' });
        closeSpan.click();
        closeSpan.dispatchEvent(new MouseEvent('click', { bubbles: true, cancelable: true }));
        return true;
    }
    return false;
"#;

// Test-analysis flow
pub const APP_DASHBOARD: &[Candidate] = &[Css("app-dashboard")];
pub const FORM_FIELDS: &[Candidate] = &[Css("div.form-fields")];
pub const REPORT_TYPE_DROPDOWN: &[Candidate] = &[
    Css("label[aria-label='Report Type']"),
    Css("p-dropdown#reportdropdown"),
    Css("p-dropdown#reportdropdown label.ui-dropdown-label"),
    Css("p-dropdown#reportdropdown .ui-dropdown-trigger"),
];
pub const DROPDOWN_ITEMS: &str = "li.ui-dropdown-item";
pub const TEST_ANALYSIS_OPTION: &[Candidate] = &[
    CssWithText("li.ui-dropdown-item", "Test Level Analysis"),
    CssWithText("li.ui-dropdown-item", "Test Level"),
    CssWithText("li.ui-dropdown-item", "Analysis"),
];
