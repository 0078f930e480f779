//! Stealth evasion JavaScript to inject into pages.
//! Based on puppeteer-extra-plugin-stealth techniques.

pub const STEALTH_SCRIPTS: &[&str] = &[
    // Remove webdriver property
    r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
    "#,
    // Fix chrome object
    r#"
    window.chrome = {
        runtime: {},
        loadTimes: function() {},
        csi: function() {},
        app: {}
    };
    "#,
    // Fix plugins; broker sites probe for the built-in PDF viewer
    r#"
    Object.defineProperty(navigator, 'plugins', {
        get: () => [
            { name: 'PDF Viewer', filename: 'internal-pdf-viewer', description: 'Portable Document Format' },
            { name: 'Chrome PDF Viewer', filename: 'internal-pdf-viewer', description: 'Portable Document Format' }
        ],
        configurable: true
    });
    Object.defineProperty(navigator, 'pdfViewerEnabled', {
        get: () => true,
        configurable: true
    });
    "#,
    // Norwegian locale
    r#"
    Object.defineProperty(navigator, 'languages', {
        get: () => ['nb-NO', 'nb', 'no', 'en-US', 'en'],
        configurable: true
    });
    "#,
    // Remove automation-related properties
    r#"
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Array;
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Promise;
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Symbol;
    "#,
    // Dismiss consent overlays that swallow clicks
    r#"
    (() => {
        const labels = ['godta alle', 'godta', 'aksepter', 'accept all', 'accept'];
        for (const el of document.querySelectorAll('button, [role="button"]')) {
            const text = (el.innerText || '').trim().toLowerCase();
            if (labels.includes(text)) { el.click(); break; }
        }
    })();
    "#,
];
