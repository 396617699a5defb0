//! Embedded HTML/CSS/JS frontend for the detwatch dashboard.
//!
//! The entire SPA is compiled into the binary as a string constant.
//! No external assets, no build tools, no CDN dependencies. Every section
//! arrives pre-rendered from `/api/view`; the page only swaps HTML and draws
//! the chart series.

/// The complete single-page dashboard HTML.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>detwatch Dashboard</title>
<style>
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --green: #3fb950;
  --yellow: #d29922;
  --red: #f85149;
  --purple: #bc8cff;
  --cyan: #39d2c0;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
  --mono: 'SF Mono', 'Cascadia Code', 'Fira Code', monospace;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  background: var(--bg);
  color: var(--text);
  font-family: var(--font);
  font-size: 14px;
  line-height: 1.5;
}

.app { max-width: 1200px; margin: 0 auto; padding: 24px; }

header {
  display: flex;
  align-items: center;
  justify-content: space-between;
  margin-bottom: 24px;
  padding-bottom: 16px;
  border-bottom: 1px solid var(--border);
}
header h1 { font-size: 24px; font-weight: 600; }
header h1 .logo { color: var(--accent); font-family: var(--mono); font-weight: 700; }
header .subtitle { color: var(--text-muted); font-size: 13px; }

nav {
  display: flex;
  gap: 4px;
  margin-bottom: 24px;
  background: var(--surface);
  border-radius: var(--radius);
  padding: 4px;
  border: 1px solid var(--border);
}
nav button {
  flex: 1;
  padding: 8px 16px;
  border: none;
  border-radius: 6px;
  background: transparent;
  color: var(--text-muted);
  font-size: 13px;
  cursor: pointer;
}
nav button.active { color: var(--text); background: rgba(88,166,255,0.12); }

.panel { display: none; }
.panel.active { display: block; }

.card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 20px;
  margin-bottom: 16px;
}
.card h2 { font-size: 16px; font-weight: 600; margin-bottom: 16px; }
.grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(260px, 1fr)); gap: 16px; }

/* Tiles */
.tiles { display: grid; grid-template-columns: repeat(4, 1fr); gap: 16px; margin-bottom: 16px; }
.metric-tile { background: var(--surface); border: 1px solid var(--border); border-radius: var(--radius); padding: 16px; }
.metric-label { color: var(--text-muted); font-size: 12px; text-transform: uppercase; }
.metric-value { font-size: 26px; font-weight: 700; font-family: var(--mono); color: var(--accent); }

/* Badges */
.badge { display: inline-block; padding: 2px 8px; border-radius: 10px; font-size: 11px; background: var(--border); color: var(--text); }
.bg-success { background: var(--green); color: #000; }
.bg-warning { background: var(--yellow); color: #000; }
.bg-danger { background: var(--red); }
.bg-info { background: var(--cyan); color: #000; }
.bg-primary { background: var(--accent); color: #000; }
.bg-secondary { background: var(--border); }
.text-muted { color: var(--text-muted); }
.me-1 { margin-right: 4px; }
.mb-1 { margin-bottom: 4px; }

/* Timeframe buttons */
.timeframes { display: flex; gap: 4px; margin-bottom: 12px; }
.timeframes button {
  padding: 4px 12px;
  border: 1px solid var(--border);
  border-radius: 6px;
  background: transparent;
  color: var(--text-muted);
  cursor: pointer;
}
.timeframes button.active { color: var(--accent); border-color: var(--accent); }

/* Bar chart */
.chart { display: flex; align-items: flex-end; gap: 4px; height: 160px; padding-top: 20px; }
.chart .bar-group { flex: 1; display: flex; flex-direction: column; align-items: center; height: 100%; justify-content: flex-end; }
.chart .bar { width: 100%; max-width: 28px; background: var(--accent); border-radius: 3px 3px 0 0; min-height: 2px; position: relative; }
.chart.line .bar { background: var(--purple); }
.chart .bar-label { font-size: 10px; color: var(--text-muted); margin-top: 6px; max-width: 60px; overflow: hidden; white-space: nowrap; }
.chart-tooltip {
  position: absolute;
  bottom: calc(100% + 6px);
  left: 50%;
  transform: translateX(-50%);
  background: #333;
  padding: 4px 8px;
  border-radius: 4px;
  font-size: 11px;
  white-space: nowrap;
  pointer-events: none;
  opacity: 0;
}
.chart .bar:hover .chart-tooltip { opacity: 1; }

/* Share chart (pie / doughnut) */
.share-row { display: flex; align-items: center; gap: 8px; margin-bottom: 6px; }
.share-row .name { width: 110px; color: var(--text-muted); font-size: 12px; overflow: hidden; white-space: nowrap; }
.share-row .track { flex: 1; background: var(--bg); border-radius: 4px; height: 14px; }
.share-row .fill { background: var(--green); height: 100%; border-radius: 4px; }
.share-row .pct { width: 48px; text-align: right; font-family: var(--mono); font-size: 12px; }

/* Tables */
table { width: 100%; border-collapse: collapse; }
th, td { text-align: left; padding: 8px 12px; border-bottom: 1px solid var(--border); }
th { color: var(--text-muted); font-size: 12px; text-transform: uppercase; }
.progress { background: var(--bg); border-radius: 4px; height: 16px; overflow: hidden; }
.progress-bar { background: var(--green); height: 100%; font-size: 10px; text-align: center; color: #000; }
.progress-bar.bg-warning { background: var(--yellow); }

/* Detections */
#section-detections { display: grid; grid-template-columns: repeat(auto-fill, minmax(220px, 1fr)); gap: 12px; }
.detection-card { background: var(--bg); border: 1px solid var(--border); border-radius: var(--radius); padding: 12px; }
.detection-thumbnail, .detail-image, .result-image { max-width: 100%; border-radius: 6px; }
.detection-placeholder { height: 120px; display: flex; align-items: center; justify-content: center; color: var(--text-muted); background: var(--surface); border-radius: 6px; }
.card-meta, .card-foot { display: flex; justify-content: space-between; margin: 6px 0; }
.text-truncate { overflow: hidden; white-space: nowrap; text-overflow: ellipsis; }
.list-group { list-style: none; }
.list-group-item { display: flex; justify-content: space-between; gap: 8px; padding: 6px 0; border-bottom: 1px solid var(--border); }

/* Logs */
.error-log, .warning-log, .info-log { border-left: 3px solid var(--red); padding: 8px 12px; margin-bottom: 8px; background: var(--bg); }
.warning-log { border-color: var(--yellow); }
.info-log { border-color: var(--cyan); }
.log-head { display: flex; justify-content: space-between; }

/* Alerts */
.alert { padding: 12px 16px; border-radius: var(--radius); margin-bottom: 16px; border: 1px solid var(--yellow); color: var(--yellow); }
.alert-danger { border-color: var(--red); color: var(--red); }

/* Buttons and inputs */
.btn { padding: 8px 16px; border-radius: 6px; border: 1px solid var(--border); background: var(--surface); color: var(--text); cursor: pointer; }
.btn.primary { background: var(--accent); color: #000; border-color: var(--accent); }
.btn.danger, .btn-delete { border: 1px solid var(--red); color: var(--red); background: transparent; padding: 6px 12px; border-radius: 6px; cursor: pointer; }
.btn-details { border: 1px solid var(--accent); color: var(--accent); background: transparent; padding: 2px 8px; border-radius: 6px; cursor: pointer; }
input[type=text], input[type=file] { background: var(--bg); border: 1px solid var(--border); color: var(--text); padding: 6px 10px; border-radius: 6px; width: 100%; margin-bottom: 8px; }

/* Detail overlay */
.overlay { position: fixed; inset: 0; background: rgba(0,0,0,0.6); display: none; align-items: flex-start; justify-content: center; padding: 48px 16px; overflow-y: auto; }
.overlay.show { display: flex; }
.overlay .card { max-width: 720px; width: 100%; }
.detail-stats { display: flex; gap: 16px; margin: 12px 0; color: var(--text-muted); }
.detail-stats span { color: var(--accent); font-family: var(--mono); font-weight: 700; }

/* Toast */
.toast {
  position: fixed;
  bottom: 24px;
  right: 24px;
  background: var(--green);
  color: #000;
  padding: 10px 16px;
  border-radius: var(--radius);
  opacity: 0;
  transition: opacity 0.2s;
}
.toast.show { opacity: 1; }
.toast.error { background: var(--red); color: #fff; }

.empty { text-align: center; color: var(--text-muted); padding: 24px; }
</style>
</head>
<body>
<div class="app">
  <header>
    <div>
      <h1><span class="logo">detwatch</span> Dashboard</h1>
      <div class="subtitle">Object detection service monitor</div>
    </div>
    <div class="subtitle" id="last-update"></div>
  </header>

  <div id="section-connection"></div>

  <nav id="nav">
    <button class="active" data-panel="dashboard">Dashboard</button>
    <button data-panel="analytics">Analytics</button>
    <button data-panel="detect">Detect</button>
    <button data-panel="logs">Error Logs</button>
  </nav>

  <!-- Dashboard Panel -->
  <div class="panel active" id="panel-dashboard">
    <div class="tiles" id="section-metrics"></div>
    <div class="grid">
      <div class="card">
        <h2>API Calls</h2>
        <div class="timeframes" data-target="chart-timeframe">
          <button data-value="day">Day</button>
          <button data-value="week">Week</button>
          <button data-value="month">Month</button>
        </div>
        <div id="chart-api-calls"></div>
      </div>
      <div class="card">
        <h2>Detection Categories</h2>
        <div id="chart-detection-categories"></div>
      </div>
    </div>
    <div class="card">
      <h2>System Status</h2>
      <table>
        <thead><tr><th>Service</th><th>Status</th><th>Load</th><th>Uptime</th><th>Last Update</th></tr></thead>
        <tbody id="section-system-status"></tbody>
      </table>
    </div>
    <div class="card">
      <h2>Recent Detections</h2>
      <div id="section-detections"><div class="empty">Loading...</div></div>
    </div>
  </div>

  <!-- Analytics Panel -->
  <div class="panel" id="panel-analytics">
    <div class="timeframes" data-target="timeframe">
      <button data-value="day">Day</button>
      <button data-value="week">Week</button>
      <button data-value="month">Month</button>
    </div>
    <div class="tiles" id="section-analytics"></div>
    <div class="grid">
      <div class="card"><h2>Hourly Usage</h2><div id="chart-hourly-usage"></div></div>
      <div class="card"><h2>Response Time</h2><div id="chart-response-time"></div></div>
      <div class="card"><h2>Top Categories</h2><div id="chart-top-categories"></div></div>
      <div class="card"><h2>Device Distribution</h2><div id="chart-device-distribution"></div></div>
    </div>
  </div>

  <!-- Detect Panel -->
  <div class="panel" id="panel-detect">
    <div class="grid">
      <div class="card">
        <h2>Upload Image</h2>
        <input type="file" id="upload-file" accept="image/*">
        <button class="btn primary" id="btn-upload">Detect Objects</button>
      </div>
      <div class="card">
        <h2>Image URL</h2>
        <input type="text" id="upload-url" placeholder="https://example.com/image.jpg">
        <button class="btn primary" id="btn-upload-url">Detect from URL</button>
      </div>
    </div>
    <div class="card">
      <h2>Results</h2>
      <div id="upload-result"><div class="empty">No detection run yet.</div></div>
    </div>
  </div>

  <!-- Logs Panel -->
  <div class="panel" id="panel-logs">
    <div class="card">
      <h2>Error Logs</h2>
      <div id="section-error-logs"></div>
    </div>
  </div>
</div>

<!-- Detail overlay -->
<div class="overlay" id="detail-overlay">
  <div class="card">
    <div style="display:flex;justify-content:space-between;margin-bottom:12px">
      <h2>Detection Details</h2>
      <button class="btn" id="btn-close-detail">Close</button>
    </div>
    <div id="detail-body"></div>
  </div>
</div>

<!-- Toast -->
<div class="toast" id="toast"></div>

<script>
// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------
let revision = -1;
const chartRevisions = {};
const SECTIONS = ['metrics', 'analytics', 'system-status', 'detections', 'error-logs', 'connection'];

// ---------------------------------------------------------------------------
// API helpers
// ---------------------------------------------------------------------------
function screenHeader() {
  return { 'X-Screen': screen.width + 'x' + screen.height };
}

async function api(method, path, body) {
  const opts = { method, headers: screenHeader() };
  if (body) {
    opts.headers['Content-Type'] = 'application/json';
    opts.body = JSON.stringify(body);
  }
  const res = await fetch(path, opts);
  return res.json();
}

function toast(msg, isError) {
  const el = document.getElementById('toast');
  el.textContent = msg;
  el.className = 'toast show' + (isError ? ' error' : '');
  setTimeout(() => el.className = 'toast', 3000);
}

function esc(s) {
  const d = document.createElement('div');
  d.textContent = s == null ? '' : String(s);
  return d.innerHTML;
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------
document.getElementById('nav').addEventListener('click', e => {
  if (e.target.tagName !== 'BUTTON') return;
  const panel = e.target.dataset.panel;
  if (!panel) return;

  document.querySelectorAll('nav button').forEach(b => b.classList.remove('active'));
  e.target.classList.add('active');
  document.querySelectorAll('.panel').forEach(p => p.classList.remove('active'));
  document.getElementById('panel-' + panel).classList.add('active');
});

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------
async function loadView() {
  try {
    applyView(await api('GET', '/api/view'));
  } catch (e) {
    document.getElementById('last-update').textContent = 'detwatch server unreachable';
  }
}

function applyView(v) {
  if (v.revision === revision) return;
  revision = v.revision;

  for (const name of SECTIONS) {
    const html = v.sections[name];
    const el = document.getElementById('section-' + name);
    if (el && html !== undefined && el.innerHTML !== html) el.innerHTML = html;
  }
  for (const [name, chart] of Object.entries(v.charts)) {
    if (chartRevisions[name] === chart.revision) continue;
    chartRevisions[name] = chart.revision;
    drawChart(document.getElementById('chart-' + name), chart);
  }
  markTimeframe('timeframe', v.timeframe);
  markTimeframe('chart-timeframe', v.chart_timeframe);
  document.getElementById('last-update').textContent = 'Updated ' + new Date().toLocaleTimeString();
}

function markTimeframe(target, value) {
  document.querySelectorAll(`.timeframes[data-target="${target}"] button`).forEach(b =>
    b.classList.toggle('active', b.dataset.value === value));
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------
function drawChart(el, chart) {
  if (!el) return;
  if (chart.labels.length === 0) {
    el.innerHTML = '<div class="empty">No data</div>';
    return;
  }
  if (chart.kind === 'pie' || chart.kind === 'doughnut') {
    const total = chart.data.reduce((a, b) => a + b, 0) || 1;
    el.innerHTML = chart.labels.map((label, i) => {
      const pct = chart.data[i] / total * 100;
      return `<div class="share-row">
        <div class="name">${esc(label)}</div>
        <div class="track"><div class="fill" style="width:${pct}%"></div></div>
        <div class="pct">${pct.toFixed(1)}%</div>
      </div>`;
    }).join('');
    return;
  }
  const max = Math.max(...chart.data, 1);
  el.innerHTML = `<div class="chart ${chart.kind}">` + chart.labels.map((label, i) => {
    const h = Math.max(chart.data[i] / max * 100, 2);
    return `<div class="bar-group">
      <div class="bar" style="height:${h}%">
        <div class="chart-tooltip">${esc(label)}: ${chart.data[i].toLocaleString()} ${esc(chart.dataset_label)}</div>
      </div>
      <div class="bar-label">${esc(label)}</div>
    </div>`;
  }).join('') + '</div>';
}

document.querySelectorAll('.timeframes').forEach(group => {
  group.addEventListener('click', async e => {
    if (e.target.tagName !== 'BUTTON') return;
    const value = encodeURIComponent(e.target.dataset.value);
    try {
      applyView(await api('POST', `/api/${group.dataset.target}?value=${value}`));
    } catch (err) {
      toast('Failed to switch timeframe: ' + err.message, true);
    }
  });
});

// ---------------------------------------------------------------------------
// Detail panel
// ---------------------------------------------------------------------------
function closeDetail() {
  document.getElementById('detail-overlay').classList.remove('show');
}

async function openDetail(key) {
  const body = document.getElementById('detail-body');
  body.innerHTML = '<div class="empty">Loading...</div>';
  document.getElementById('detail-overlay').classList.add('show');
  try {
    const res = await api('GET', '/api/detections/' + encodeURIComponent(key));
    body.innerHTML = res.html;
  } catch (e) {
    body.innerHTML = '<div class="empty">Detection data could not be loaded</div>';
  }
}

async function deleteDetection(id) {
  if (!confirm('Are you sure you want to delete this detection record?')) return;
  try {
    const res = await api('DELETE', '/api/detections/' + encodeURIComponent(id));
    toast(res.message, res.alert === 'error');
    if (res.close_detail) closeDetail();
  } catch (e) {
    toast('Failed to delete detection: ' + e.message, true);
  }
}

document.getElementById('section-detections').addEventListener('click', e => {
  const card = e.target.closest('[data-detection-key]');
  if (card) openDetail(card.dataset.detectionKey);
});
document.getElementById('detail-body').addEventListener('click', e => {
  const btn = e.target.closest('.btn-delete');
  if (btn) deleteDetection(btn.dataset.detectionId);
});
document.getElementById('btn-close-detail').addEventListener('click', closeDetail);
document.getElementById('detail-overlay').addEventListener('click', e => {
  if (e.target.id === 'detail-overlay') closeDetail();
});

// ---------------------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------------------
function showUpload(res) {
  document.getElementById('upload-result').innerHTML = res.html;
  if (res.ok) toast('Detection complete');
}

document.getElementById('btn-upload').addEventListener('click', async () => {
  const file = document.getElementById('upload-file').files[0];
  const headers = screenHeader();
  if (file) {
    headers['Content-Type'] = file.type || 'application/octet-stream';
    headers['X-File-Name'] = encodeURIComponent(file.name);
  }
  try {
    const res = await fetch('/api/detect', { method: 'POST', headers, body: file || '' });
    showUpload(await res.json());
  } catch (e) {
    toast('Upload failed: ' + e.message, true);
  }
});

document.getElementById('btn-upload-url').addEventListener('click', async () => {
  const url = document.getElementById('upload-url').value;
  try {
    showUpload(await api('POST', '/api/detect/url', { url }));
  } catch (e) {
    toast('Detection failed: ' + e.message, true);
  }
});

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------
loadView();
setInterval(loadView, 2000);
</script>
</body>
</html>
"##;
